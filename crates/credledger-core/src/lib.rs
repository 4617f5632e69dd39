//! Credledger Core
//!
//! Domain and wire types shared by the credential ledger adapter.
//! Claim definitions and issuer public keys are the domain side; requests,
//! replies and ledger operations are the wire side.

pub mod claim_def;
pub mod error;
pub mod identity;
pub mod public_key;
pub mod request;

pub use claim_def::{ClaimDefinition, ClaimDefinitionId, ClaimDefinitionKey};
pub use error::{CredLedgerError, Result};
pub use identity::Identifier;
pub use public_key::{
    Accumulator, AccumulatorPublicKey, PublicKey, RevocationPublicKey, StrDict, Tails, Timestamp,
};
pub use request::{LedgerOperation, Reply, Request, RequestKey, SignedRequest, TxnType};
