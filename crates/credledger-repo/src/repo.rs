//! Public repository facade
//!
//! The contract application code depends on. Claim definitions and issuer
//! keys go through [`PublicRepo`]; the revocation family lives in
//! [`RevocationRepo`] so a backend can state whether it supports it.

use std::sync::Arc;

use async_trait::async_trait;
use credledger_core::{
    Accumulator, AccumulatorPublicKey, ClaimDefinition, ClaimDefinitionId, CredLedgerError,
    PublicKey, Result, RevocationPublicKey, Tails, Timestamp,
};
use credledger_ledger::LedgerClient;
use credledger_wallet::Wallet;

use crate::codec;
use crate::config::RepoConfig;
use crate::correlator::RequestCorrelator;

/// What a repository backend can store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoCapability {
    /// Claim definitions and issuer public keys only
    DefinitionOnly,
    /// Also revocation keys, accumulators and tails
    DefinitionWithRevocation,
}

impl RepoCapability {
    pub fn supports_revocation(&self) -> bool {
        matches!(self, RepoCapability::DefinitionWithRevocation)
    }
}

/// Claim definitions and issuer public keys
#[async_trait]
pub trait PublicRepo: Send + Sync {
    fn capability(&self) -> RepoCapability;

    /// Fetch a stored claim definition by issuer, name and version
    async fn get_claim_def(&self, id: &ClaimDefinitionId) -> Result<ClaimDefinition>;

    /// Fetch the issuer key certifying a stored claim definition
    async fn get_public_key(&self, id: &ClaimDefinitionId) -> Result<PublicKey>;

    /// Store a claim definition, returning it with its sequence number
    async fn submit_claim_def(&self, def: &ClaimDefinition) -> Result<ClaimDefinition>;

    /// Store the issuer keys for a stored claim definition
    async fn submit_public_keys(
        &self,
        id: &ClaimDefinitionId,
        pk: &PublicKey,
        pk_revocation: Option<&RevocationPublicKey>,
    ) -> Result<()>;
}

/// Revocation material for a claim definition
#[async_trait]
pub trait RevocationRepo: Send + Sync {
    async fn get_public_key_revocation(&self, id: &ClaimDefinitionId)
        -> Result<RevocationPublicKey>;

    async fn get_public_key_accumulator(
        &self,
        id: &ClaimDefinitionId,
    ) -> Result<AccumulatorPublicKey>;

    async fn get_accumulator(&self, id: &ClaimDefinitionId) -> Result<Accumulator>;

    async fn get_tails(&self, id: &ClaimDefinitionId) -> Result<Tails>;

    async fn submit_accumulator(
        &self,
        id: &ClaimDefinitionId,
        accum_pk: &AccumulatorPublicKey,
        accum: &Accumulator,
        tails: &Tails,
    ) -> Result<()>;

    async fn submit_accum_update(
        &self,
        id: &ClaimDefinitionId,
        accum: &Accumulator,
        timestamp: Timestamp,
    ) -> Result<()>;
}

/// Repository backed by a quorum ledger
#[derive(Clone)]
pub struct LedgerPublicRepo {
    correlator: RequestCorrelator,
}

impl LedgerPublicRepo {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        wallet: Arc<dyn Wallet>,
        config: &RepoConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            correlator: RequestCorrelator::new(client, wallet, config.schedule()),
        })
    }

    pub fn correlator(&self) -> &RequestCorrelator {
        &self.correlator
    }
}

#[async_trait]
impl PublicRepo for LedgerPublicRepo {
    fn capability(&self) -> RepoCapability {
        RepoCapability::DefinitionOnly
    }

    async fn get_claim_def(&self, id: &ClaimDefinitionId) -> Result<ClaimDefinition> {
        let op = codec::encode_get_claim_def(id);
        let (data, seq_no) = self.correlator.send(op, codec::decode_get_reply).await?;

        if data.is_empty() {
            return Err(CredLedgerError::NotFound(format!("claim definition {}", id.key)));
        }
        let seq_no = seq_no.ok_or_else(|| {
            CredLedgerError::MalformedReply("claim definition record without seqNo".to_string())
        })?;
        codec::claim_def_from_data(&data, seq_no)
    }

    async fn get_public_key(&self, id: &ClaimDefinitionId) -> Result<PublicKey> {
        let op = codec::encode_get_public_key(id)?;
        let (record, _) = self.correlator.send(op, codec::decode_get_reply).await?;

        if record.is_empty() {
            return Err(CredLedgerError::NotFound(format!("issuer key for {}", id.key)));
        }
        codec::decode_public_key(codec::nested_data(&record)?)
    }

    async fn submit_claim_def(&self, def: &ClaimDefinition) -> Result<ClaimDefinition> {
        let op = codec::encode_submit_claim_def(def)?;
        let (_, seq_no) = self.correlator.send(op, codec::decode_submit_reply).await?;
        let seq_no = seq_no.ok_or_else(|| {
            CredLedgerError::MalformedReply("write reply without seqNo".to_string())
        })?;

        let stored = ClaimDefinition {
            issuer_id: self.correlator.wallet().default_id().clone(),
            seq_no: Some(seq_no),
            ..def.clone()
        };
        tracing::info!("Stored claim definition {} as txn {}", stored.key(), seq_no);
        Ok(stored)
    }

    async fn submit_public_keys(
        &self,
        id: &ClaimDefinitionId,
        pk: &PublicKey,
        pk_revocation: Option<&RevocationPublicKey>,
    ) -> Result<()> {
        if pk_revocation.is_some() {
            return Err(CredLedgerError::UnsupportedOperation(
                "submit_public_keys with a revocation public key",
            ));
        }

        let op = codec::encode_submit_public_key(id, pk)?;
        let (_, seq_no) = self.correlator.send(op, codec::decode_submit_reply).await?;
        tracing::info!("Stored issuer key for {} as txn {:?}", id.key, seq_no);
        Ok(())
    }
}

#[async_trait]
impl RevocationRepo for LedgerPublicRepo {
    async fn get_public_key_revocation(
        &self,
        _id: &ClaimDefinitionId,
    ) -> Result<RevocationPublicKey> {
        Err(CredLedgerError::UnsupportedOperation("get_public_key_revocation"))
    }

    async fn get_public_key_accumulator(
        &self,
        _id: &ClaimDefinitionId,
    ) -> Result<AccumulatorPublicKey> {
        Err(CredLedgerError::UnsupportedOperation("get_public_key_accumulator"))
    }

    async fn get_accumulator(&self, _id: &ClaimDefinitionId) -> Result<Accumulator> {
        Err(CredLedgerError::UnsupportedOperation("get_accumulator"))
    }

    async fn get_tails(&self, _id: &ClaimDefinitionId) -> Result<Tails> {
        Err(CredLedgerError::UnsupportedOperation("get_tails"))
    }

    async fn submit_accumulator(
        &self,
        _id: &ClaimDefinitionId,
        _accum_pk: &AccumulatorPublicKey,
        _accum: &Accumulator,
        _tails: &Tails,
    ) -> Result<()> {
        Err(CredLedgerError::UnsupportedOperation("submit_accumulator"))
    }

    async fn submit_accum_update(
        &self,
        _id: &ClaimDefinitionId,
        _accum: &Accumulator,
        _timestamp: Timestamp,
    ) -> Result<()> {
        Err(CredLedgerError::UnsupportedOperation("submit_accum_update"))
    }
}
