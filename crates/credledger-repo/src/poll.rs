//! Bounded polling
//!
//! Retry-until-ready loop shared by everything that waits on the ledger.

use std::time::Duration;

use credledger_core::{CredLedgerError, Result as LedgerResult};
use thiserror::Error;
use tokio::time::Instant;

/// How long and how often to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Hard upper bound on the total wait
    pub timeout: Duration,

    /// Pause between two probes
    pub retry_wait: Duration,
}

impl PollSchedule {
    pub fn new(timeout: Duration, retry_wait: Duration) -> Self {
        Self {
            timeout,
            retry_wait,
        }
    }

    /// Both durations positive and the retry wait within the timeout
    pub fn validate(&self) -> LedgerResult<()> {
        if self.timeout.is_zero() {
            return Err(CredLedgerError::Config(
                "request timeout must be positive".to_string(),
            ));
        }
        if self.retry_wait.is_zero() {
            return Err(CredLedgerError::Config(
                "retry wait must be positive".to_string(),
            ));
        }
        if self.retry_wait > self.timeout {
            return Err(CredLedgerError::Config(format!(
                "retry wait {:?} exceeds request timeout {:?}",
                self.retry_wait, self.timeout
            )));
        }
        Ok(())
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::new(Duration::from_secs(20), Duration::from_millis(500))
    }
}

/// The probe never became ready before the deadline
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("not ready after {attempts} attempts ({waited:?})")]
pub struct PollTimeout {
    pub attempts: u32,
    pub waited: Duration,
}

/// Call `probe` until it yields a value or the schedule's timeout elapses.
///
/// The first probe runs immediately and a last one runs at the deadline.
/// Sleeps never extend past the deadline.
pub async fn eventually<T, F>(mut probe: F, schedule: PollSchedule) -> Result<T, PollTimeout>
where
    F: FnMut() -> Option<T>,
{
    let start = Instant::now();
    let deadline = start + schedule.timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = probe() {
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PollTimeout {
                attempts,
                waited: now - start,
            });
        }
        tokio::time::sleep(schedule.retry_wait.min(deadline - now)).await;
    }
}
