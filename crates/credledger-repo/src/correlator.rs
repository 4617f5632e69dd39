//! Request correlation
//!
//! Signs an operation, submits it, and waits for the quorum reply matching
//! the request key assigned by the wallet.

use std::sync::Arc;

use credledger_core::{CredLedgerError, LedgerOperation, Reply, Request, Result};
use credledger_ledger::{ConsensusStatus, LedgerClient};
use credledger_wallet::Wallet;

use crate::poll::{eventually, PollSchedule};

/// Submit-and-wait round trips against a ledger client
#[derive(Clone)]
pub struct RequestCorrelator {
    client: Arc<dyn LedgerClient>,
    wallet: Arc<dyn Wallet>,
    schedule: PollSchedule,
}

impl RequestCorrelator {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        wallet: Arc<dyn Wallet>,
        schedule: PollSchedule,
    ) -> Self {
        Self {
            client,
            wallet,
            schedule,
        }
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }

    pub fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    /// Round trip with the default schedule
    pub async fn send<T, F>(&self, operation: LedgerOperation, decode: F) -> Result<T>
    where
        F: FnOnce(&Reply) -> Result<T>,
    {
        self.send_with(operation, decode, self.schedule).await
    }

    /// Sign and submit `operation`, wait for its quorum reply, then decode it.
    ///
    /// `decode` runs once, on the first confirmed reply. A rejection ends the
    /// wait immediately. Timing out leaves the outcome unknown: the ledger may
    /// still apply the request later. An invalid `schedule` fails with
    /// `Config` before anything is submitted.
    pub async fn send_with<T, F>(
        &self,
        operation: LedgerOperation,
        decode: F,
        schedule: PollSchedule,
    ) -> Result<T>
    where
        F: FnOnce(&Reply) -> Result<T>,
    {
        schedule.validate()?;
        let request = Request::new(self.wallet.default_id().clone(), operation);
        let signed = self.wallet.prepare_request(request)?;
        let key = signed.key();
        let txn_type = signed.operation.txn_type;

        tracing::debug!("Submitting request {} of type {}", key, txn_type);
        self.client.submit(signed)?;

        let polled = eventually(
            || match self.client.reply_if_consensus(&key) {
                Ok(ConsensusStatus::Pending) => None,
                Ok(ConsensusStatus::Confirmed(reply)) => Some(Ok(reply)),
                Ok(ConsensusStatus::Rejected(reason)) => {
                    Some(Err(CredLedgerError::RequestRejected {
                        key: key.clone(),
                        reason,
                    }))
                }
                Err(e) => Some(Err(e)),
            },
            schedule,
        )
        .await;

        let reply = match polled {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::warn!("Request {} failed: {}", key, e);
                return Err(e);
            }
            Err(timeout) => {
                tracing::warn!(
                    "No quorum reply for request {} after {} polls",
                    key,
                    timeout.attempts
                );
                return Err(CredLedgerError::RequestTimeout {
                    key,
                    waited: timeout.waited,
                });
            }
        };

        tracing::debug!("Request {} confirmed", key);
        decode(&reply)
    }
}
