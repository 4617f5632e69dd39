//! Credledger Repo
//!
//! Stores and fetches claim definitions and issuer public keys as
//! transactions on a quorum-replicated ledger.
//!
//! This crate provides:
//! - The transaction codec between domain entities and ledger operations
//! - A bounded polling primitive and the request correlator built on it
//! - The public repository facade used by application code

pub mod codec;
pub mod config;
pub mod correlator;
pub mod poll;
pub mod repo;

pub use config::RepoConfig;
pub use correlator::RequestCorrelator;
pub use poll::{eventually, PollSchedule, PollTimeout};
pub use repo::{LedgerPublicRepo, PublicRepo, RepoCapability, RevocationRepo};
