//! In-memory ledger (for development/testing)
//!
//! Keeps an append-only transaction log and answers reads from it. Replies
//! carry their `data` field as a Python-repr style string with single
//! quotes, the same shape the real ledger client hands back.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use credledger_core::request::fields;
use credledger_core::{
    CredLedgerError, Identifier, LedgerOperation, Reply, RequestKey, Result, SignedRequest,
    StrDict, TxnType,
};
use serde_json::{json, Value};

use crate::{ConsensusStatus, LedgerClient};

/// When submitted requests reach consensus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPolicy {
    /// Confirmed on the first poll
    Immediate,

    /// Confirmed once the request has been polled more than `n` times
    AfterPolls(u32),

    /// Never confirmed
    Never,
}

/// A write transaction stored on the ledger
#[derive(Debug, Clone)]
struct StoredTxn {
    seq_no: u64,
    txn_type: TxnType,
    origin: Identifier,
    operation: LedgerOperation,
}

impl StoredTxn {
    fn data(&self) -> Option<&StrDict> {
        self.operation.field(fields::DATA).and_then(Value::as_object)
    }

    fn data_str(&self, field: &str) -> Option<&str> {
        self.data()
            .and_then(|d| d.get(field))
            .and_then(Value::as_str)
    }

    fn ref_seq_no(&self) -> Option<u64> {
        self.operation.field(fields::REF).and_then(Value::as_u64)
    }
}

#[derive(Debug)]
struct PendingRequest {
    request: SignedRequest,
    polls: u32,
}

#[derive(Debug, Default)]
struct LedgerState {
    txns: Vec<StoredTxn>,
    pending: HashMap<RequestKey, PendingRequest>,
    /// Every confirmed or rejected outcome, kept for the ledger's lifetime so
    /// repeated polls read the same answer. Never pruned.
    outcomes: HashMap<RequestKey, ConsensusStatus>,
}

/// In-memory ledger
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    policy: Mutex<ConfirmPolicy>,
}

impl InMemoryLedger {
    pub fn new(policy: ConfirmPolicy) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            policy: Mutex::new(policy),
        }
    }

    /// Change the confirmation policy for requests polled from now on
    pub fn set_policy(&self, policy: ConfirmPolicy) -> Result<()> {
        let mut current = self
            .policy
            .lock()
            .map_err(|e| CredLedgerError::Ledger(e.to_string()))?;
        *current = policy;
        Ok(())
    }

    /// Number of write transactions on the ledger
    pub fn txn_count(&self) -> Result<usize> {
        Ok(self.lock()?.txns.len())
    }

    /// Number of submitted requests not yet confirmed or rejected
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.lock()?.pending.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|e| CredLedgerError::Ledger(e.to_string()))
    }

    fn current_policy(&self) -> Result<ConfirmPolicy> {
        self.policy
            .lock()
            .map(|p| *p)
            .map_err(|e| CredLedgerError::Ledger(e.to_string()))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(ConfirmPolicy::Immediate)
    }
}

impl LedgerClient for InMemoryLedger {
    fn submit(&self, request: SignedRequest) -> Result<()> {
        let key = request.key();
        let mut state = self.lock()?;

        if state.pending.contains_key(&key) || state.outcomes.contains_key(&key) {
            return Err(CredLedgerError::Ledger(format!(
                "request {} already submitted",
                key
            )));
        }

        tracing::debug!(
            "Ledger received request {} ({})",
            key,
            request.operation.txn_type
        );
        state
            .pending
            .insert(key, PendingRequest { request, polls: 0 });
        Ok(())
    }

    fn reply_if_consensus(&self, key: &RequestKey) -> Result<ConsensusStatus> {
        let policy = self.current_policy()?;
        let mut state = self.lock()?;

        if let Some(outcome) = state.outcomes.get(key) {
            return Ok(outcome.clone());
        }

        let ready = match state.pending.get_mut(key) {
            None => return Ok(ConsensusStatus::Pending),
            Some(pending) => {
                pending.polls += 1;
                match policy {
                    ConfirmPolicy::Immediate => true,
                    ConfirmPolicy::AfterPolls(n) => pending.polls > n,
                    ConfirmPolicy::Never => false,
                }
            }
        };
        if !ready {
            return Ok(ConsensusStatus::Pending);
        }

        let Some(pending) = state.pending.remove(key) else {
            return Ok(ConsensusStatus::Pending);
        };
        let outcome = match execute(&mut state.txns, &pending.request) {
            Ok(reply) => ConsensusStatus::Confirmed(reply),
            Err(reason) => {
                tracing::warn!("Ledger rejected request {}: {}", key, reason);
                ConsensusStatus::Rejected(reason)
            }
        };
        state.outcomes.insert(key.clone(), outcome.clone());
        Ok(outcome)
    }
}

/// Apply one request to the log, producing the reply or a rejection reason
fn execute(
    txns: &mut Vec<StoredTxn>,
    request: &SignedRequest,
) -> std::result::Result<Reply, String> {
    let op = &request.operation;
    let mut result = StrDict::new();
    result.insert(fields::IDENTIFIER.to_string(), json!(request.identifier));
    result.insert(fields::REQ_ID.to_string(), json!(request.req_id));
    result.insert(fields::TXN_TYPE.to_string(), json!(op.txn_type.code()));

    match op.txn_type {
        TxnType::ClaimDef => {
            let data = op
                .field(fields::DATA)
                .and_then(Value::as_object)
                .ok_or("claim definition without data")?;
            let name = data
                .get(fields::NAME)
                .and_then(Value::as_str)
                .ok_or("missing name")?;
            let version = data
                .get(fields::VERSION)
                .and_then(Value::as_str)
                .ok_or("missing version")?;

            let exists = txns.iter().any(|t| {
                t.txn_type == TxnType::ClaimDef
                    && t.origin == request.identifier
                    && t.data_str(fields::NAME) == Some(name)
                    && t.data_str(fields::VERSION) == Some(version)
            });
            if exists {
                return Err(format!("claim definition {}:{} already exists", name, version));
            }

            let rendered = render_repr(&Value::Object(data.clone()));
            let seq_no = append(txns, request);
            result.insert(fields::DATA.to_string(), json!(rendered));
            result.insert(fields::SEQ_NO.to_string(), json!(seq_no));
        }
        TxnType::IssuerKey => {
            let reference = op
                .field(fields::REF)
                .and_then(Value::as_u64)
                .ok_or("issuer key without ref")?;
            let data = op
                .field(fields::DATA)
                .and_then(Value::as_object)
                .ok_or("issuer key without data")?;

            let refers_to_claim_def = txns
                .iter()
                .any(|t| t.seq_no == reference && t.txn_type == TxnType::ClaimDef);
            if !refers_to_claim_def {
                return Err(format!("ref {} is not a claim definition", reference));
            }
            let exists = txns.iter().any(|t| {
                t.txn_type == TxnType::IssuerKey
                    && t.origin == request.identifier
                    && t.ref_seq_no() == Some(reference)
            });
            if exists {
                return Err(format!("issuer key for ref {} already exists", reference));
            }

            let rendered = render_repr(&Value::Object(data.clone()));
            let seq_no = append(txns, request);
            result.insert(fields::REF.to_string(), json!(reference));
            result.insert(fields::DATA.to_string(), json!(rendered));
            result.insert(fields::SEQ_NO.to_string(), json!(seq_no));
        }
        TxnType::GetClaimDef => {
            let dest = op.str_field(fields::TARGET).ok_or("missing dest")?;
            let query = op
                .field(fields::DATA)
                .and_then(Value::as_object)
                .ok_or("missing query data")?;
            let name = query.get(fields::NAME).and_then(Value::as_str);
            let version = query.get(fields::VERSION).and_then(Value::as_str);

            let found = txns.iter().find(|t| {
                t.txn_type == TxnType::ClaimDef
                    && t.origin.as_str() == dest
                    && t.data_str(fields::NAME) == name
                    && t.data_str(fields::VERSION) == version
            });

            result.insert(fields::TARGET.to_string(), json!(dest));
            let data = match found {
                Some(txn) => {
                    let mut record = txn.data().cloned().unwrap_or_default();
                    record.insert(fields::ORIGIN.to_string(), json!(txn.origin));
                    record.insert(fields::SEQ_NO.to_string(), json!(txn.seq_no));
                    json!(render_repr(&Value::Object(record)))
                }
                None => Value::Null,
            };
            result.insert(fields::DATA.to_string(), data);
        }
        TxnType::GetIssuerKey => {
            let reference = op
                .field(fields::REF)
                .and_then(Value::as_u64)
                .ok_or("missing ref")?;
            let origin = op.str_field(fields::ORIGIN).ok_or("missing origin")?;

            let found = txns.iter().find(|t| {
                t.txn_type == TxnType::IssuerKey
                    && t.origin.as_str() == origin
                    && t.ref_seq_no() == Some(reference)
            });

            result.insert(fields::REF.to_string(), json!(reference));
            let data = match found {
                Some(txn) => {
                    let mut record = StrDict::new();
                    record.insert(fields::REF.to_string(), json!(reference));
                    record.insert(fields::ORIGIN.to_string(), json!(txn.origin));
                    record.insert(
                        fields::DATA.to_string(),
                        Value::Object(txn.data().cloned().unwrap_or_default()),
                    );
                    record.insert(fields::SEQ_NO.to_string(), json!(txn.seq_no));
                    json!(render_repr(&Value::Object(record)))
                }
                None => Value::Null,
            };
            result.insert(fields::DATA.to_string(), data);
        }
    }

    Ok(Reply(result))
}

fn append(txns: &mut Vec<StoredTxn>, request: &SignedRequest) -> u64 {
    let seq_no = txns.len() as u64 + 1;
    tracing::info!(
        "Ledger stored txn {} of type {} from {}",
        seq_no,
        request.operation.txn_type,
        request.identifier
    );
    txns.push(StoredTxn {
        seq_no,
        txn_type: request.operation.txn_type,
        origin: request.identifier.clone(),
        operation: request.operation.clone(),
    });
    seq_no
}

/// Render a value the way the ledger client stringifies maps: single quotes
/// around keys and strings, `: ` and `, ` separators. Backslashes and control
/// characters inside strings are escaped.
pub fn render_repr(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), render_repr(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        Value::Array(items) => {
            let entries: Vec<String> = items.iter().map(render_repr).collect();
            format!("[{}]", entries.join(", "))
        }
        Value::String(s) => quote(s),
        other => other.to_string(),
    }
}

fn quote(s: &str) -> String {
    // JSON string escaping, minus the surrounding double quotes
    let escaped = Value::String(s.to_string()).to_string();
    format!("'{}'", &escaped[1..escaped.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(req_id: u64, operation: LedgerOperation) -> SignedRequest {
        SignedRequest {
            identifier: Identifier::new("issuer-1"),
            req_id,
            operation,
            signature: "sig".to_string(),
        }
    }

    fn claim_def_op() -> LedgerOperation {
        LedgerOperation::new(TxnType::ClaimDef).with(
            fields::DATA,
            json!({"name": "degree", "version": "1.0", "type": "CL", "attrNames": "name,year"}),
        )
    }

    fn confirmed(status: ConsensusStatus) -> Reply {
        match status {
            ConsensusStatus::Confirmed(reply) => reply,
            other => panic!("expected confirmed reply, got {:?}", other),
        }
    }

    #[test]
    fn test_render_repr_single_quotes() {
        let rendered = render_repr(&json!({"name": "degree", "seqNo": 4}));
        assert_eq!(rendered, "{'name': 'degree', 'seqNo': 4}");
    }

    #[test]
    fn test_render_repr_escapes_strings() {
        let rendered = render_repr(&json!({"attrNames": "path\\ber,a\nb"}));
        assert_eq!(rendered, r"{'attrNames': 'path\\ber,a\nb'}");
    }

    #[test]
    fn test_submit_assigns_sequence_numbers() {
        let ledger = InMemoryLedger::default();
        let first = signed(1, claim_def_op());
        let second = signed(
            2,
            LedgerOperation::new(TxnType::ClaimDef)
                .with(fields::DATA, json!({"name": "license", "version": "1.0"})),
        );
        ledger.submit(first.clone()).unwrap();
        ledger.submit(second.clone()).unwrap();

        let reply = confirmed(ledger.reply_if_consensus(&first.key()).unwrap());
        assert_eq!(reply.seq_no(), Some(1));
        assert!(reply.data_str().unwrap().unwrap().contains("'name': 'degree'"));

        let reply = confirmed(ledger.reply_if_consensus(&second.key()).unwrap());
        assert_eq!(reply.seq_no(), Some(2));
        assert_eq!(ledger.txn_count().unwrap(), 2);
    }

    #[test]
    fn test_duplicate_claim_def_rejected() {
        let ledger = InMemoryLedger::default();
        let first = signed(1, claim_def_op());
        let again = signed(2, claim_def_op());
        ledger.submit(first.clone()).unwrap();
        ledger.reply_if_consensus(&first.key()).unwrap();
        ledger.submit(again.clone()).unwrap();

        assert!(matches!(
            ledger.reply_if_consensus(&again.key()).unwrap(),
            ConsensusStatus::Rejected(_)
        ));
    }

    #[test]
    fn test_duplicate_submission_refused() {
        let ledger = InMemoryLedger::default();
        let request = signed(1, claim_def_op());
        ledger.submit(request.clone()).unwrap();
        assert!(ledger.submit(request).is_err());
    }

    #[test]
    fn test_confirm_after_polls() {
        let ledger = InMemoryLedger::new(ConfirmPolicy::AfterPolls(2));
        let request = signed(1, claim_def_op());
        ledger.submit(request.clone()).unwrap();

        assert!(ledger.reply_if_consensus(&request.key()).unwrap().is_pending());
        assert!(ledger.reply_if_consensus(&request.key()).unwrap().is_pending());
        let reply = confirmed(ledger.reply_if_consensus(&request.key()).unwrap());
        assert_eq!(reply.seq_no(), Some(1));

        // Confirmed replies are retained and re-read without re-executing
        let again = confirmed(ledger.reply_if_consensus(&request.key()).unwrap());
        assert_eq!(again, reply);
        assert_eq!(ledger.txn_count().unwrap(), 1);
    }

    #[test]
    fn test_never_confirms() {
        let ledger = InMemoryLedger::new(ConfirmPolicy::Never);
        let request = signed(1, claim_def_op());
        ledger.submit(request.clone()).unwrap();
        for _ in 0..10 {
            assert!(ledger.reply_if_consensus(&request.key()).unwrap().is_pending());
        }
        assert_eq!(ledger.pending_count().unwrap(), 1);
    }

    #[test]
    fn test_get_claim_def_reads_log() {
        let ledger = InMemoryLedger::default();
        let submit = signed(1, claim_def_op());
        ledger.submit(submit.clone()).unwrap();
        ledger.reply_if_consensus(&submit.key()).unwrap();

        let get = signed(
            2,
            LedgerOperation::new(TxnType::GetClaimDef)
                .with(fields::TARGET, "issuer-1")
                .with(fields::DATA, json!({"name": "degree", "version": "1.0"})),
        );
        ledger.submit(get.clone()).unwrap();
        let reply = confirmed(ledger.reply_if_consensus(&get.key()).unwrap());
        let data = reply.data_str().unwrap().unwrap();
        assert!(data.contains("'seqNo': 1"));
        assert!(data.contains("'origin': 'issuer-1'"));

        let missing = signed(
            3,
            LedgerOperation::new(TxnType::GetClaimDef)
                .with(fields::TARGET, "issuer-1")
                .with(fields::DATA, json!({"name": "degree", "version": "2.0"})),
        );
        ledger.submit(missing.clone()).unwrap();
        let reply = confirmed(ledger.reply_if_consensus(&missing.key()).unwrap());
        assert_eq!(reply.data_str().unwrap(), None);
    }

    #[test]
    fn test_issuer_key_requires_claim_def_ref() {
        let ledger = InMemoryLedger::default();
        let request = signed(
            1,
            LedgerOperation::new(TxnType::IssuerKey)
                .with(fields::REF, 9)
                .with(fields::DATA, json!({"N": "1"})),
        );
        ledger.submit(request.clone()).unwrap();
        assert!(matches!(
            ledger.reply_if_consensus(&request.key()).unwrap(),
            ConsensusStatus::Rejected(_)
        ));
    }
}
