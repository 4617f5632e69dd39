//! Credledger Ledger
//!
//! The ledger client interface the adapter submits through, plus an
//! in-memory ledger for development and testing.

pub mod memory;

use credledger_core::{Reply, RequestKey, Result, SignedRequest};

pub use memory::{ConfirmPolicy, InMemoryLedger};

/// Answer of the ledger client for one request key
#[derive(Debug, Clone, PartialEq)]
pub enum ConsensusStatus {
    /// Not enough matching replies yet
    Pending,

    /// A quorum of nodes agreed on this reply
    Confirmed(Reply),

    /// A quorum of nodes rejected the request
    Rejected(String),
}

impl ConsensusStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ConsensusStatus::Pending)
    }
}

/// Client side of a quorum-replicated ledger
///
/// Submission is fire-and-forget; replies accumulate inside the client and
/// are read back with [`LedgerClient::reply_if_consensus`]. Reading never
/// resubmits.
pub trait LedgerClient: Send + Sync {
    /// Send a signed request to the ledger nodes
    fn submit(&self, request: SignedRequest) -> Result<()>;

    /// Current consensus state of the request identified by `key`
    fn reply_if_consensus(&self, key: &RequestKey) -> Result<ConsensusStatus>;
}
