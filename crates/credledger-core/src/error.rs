//! Error types for the credential ledger adapter

use std::time::Duration;

use thiserror::Error;

use crate::request::RequestKey;

/// Main error type for credential ledger operations
#[derive(Error, Debug)]
pub enum CredLedgerError {
    #[error("No quorum reply for request {key} after {waited:?}")]
    RequestTimeout { key: RequestKey, waited: Duration },

    #[error("Request {key} rejected by the ledger: {reason}")]
    RequestRejected { key: RequestKey, reason: String },

    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("Not found on ledger: {0}")]
    NotFound(String),

    #[error("Invalid claim definition: {0}")]
    InvalidClaimDef(String),

    #[error("Claim definition {0} has no ledger sequence number")]
    MissingClaimDefSeqNo(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for CredLedgerError {
    fn from(err: serde_json::Error) -> Self {
        CredLedgerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CredLedgerError>;
