//! Test utilities for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use credledger_core::{
    ClaimDefinition, Identifier, PublicKey, Reply, RequestKey, Result, SignedRequest,
};
use credledger_ledger::{ConfirmPolicy, ConsensusStatus, InMemoryLedger, LedgerClient};
use credledger_repo::{LedgerPublicRepo, RepoConfig};
use credledger_wallet::{SimpleWallet, Wallet};

pub const TIMEOUT: Duration = Duration::from_secs(2);
pub const RETRY_WAIT: Duration = Duration::from_millis(100);

pub fn test_config() -> RepoConfig {
    RepoConfig::default()
        .with_request_timeout(TIMEOUT)
        .with_retry_wait(RETRY_WAIT)
}

/// Repository wired to an in-memory ledger
pub struct TestRepo {
    pub repo: LedgerPublicRepo,
    pub ledger: Arc<InMemoryLedger>,
    pub issuer: Identifier,
}

impl TestRepo {
    pub fn new(policy: ConfirmPolicy) -> Self {
        let ledger = Arc::new(InMemoryLedger::new(policy));
        let wallet = Arc::new(SimpleWallet::new());
        let issuer = wallet.default_id().clone();
        let repo = LedgerPublicRepo::new(ledger.clone(), wallet, &test_config())
            .expect("valid test config");

        Self {
            repo,
            ledger,
            issuer,
        }
    }
}

/// Ledger client that confirms every request with the same canned reply
pub struct ScriptedLedger {
    reply: Reply,
    submitted: Mutex<Vec<RequestKey>>,
}

impl ScriptedLedger {
    pub fn new(reply: serde_json::Value) -> Self {
        let map = reply.as_object().cloned().unwrap_or_default();
        Self {
            reply: Reply(map),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

impl LedgerClient for ScriptedLedger {
    fn submit(&self, request: SignedRequest) -> Result<()> {
        self.submitted.lock().unwrap().push(request.key());
        Ok(())
    }

    fn reply_if_consensus(&self, key: &RequestKey) -> Result<ConsensusStatus> {
        if self.submitted.lock().unwrap().contains(key) {
            Ok(ConsensusStatus::Confirmed(self.reply.clone()))
        } else {
            Ok(ConsensusStatus::Pending)
        }
    }
}

pub fn repo_over(ledger: Arc<dyn LedgerClient>) -> LedgerPublicRepo {
    LedgerPublicRepo::new(ledger, Arc::new(SimpleWallet::new()), &test_config())
        .expect("valid test config")
}

pub fn claim_def(name: &str, attrs: &[&str]) -> ClaimDefinition {
    ClaimDefinition::new(
        name,
        "1.0",
        attrs.iter().map(|a| a.to_string()).collect(),
        "local-issuer",
    )
}

pub fn public_key() -> PublicKey {
    let mut r = BTreeMap::new();
    r.insert("age".to_string(), "8827363".to_string());
    r.insert("name".to_string(), "1928374".to_string());
    PublicKey {
        n: "1234567890123".to_string(),
        r,
        s: "98765".to_string(),
        z: "55555".to_string(),
    }
}
