//! Repository configuration

use std::time::Duration;

use credledger_core::Result;

use crate::poll::PollSchedule;

/// Request timing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    /// Maximum wall-clock wait for a quorum reply
    pub request_timeout: Duration,
    /// Pause between two polls of the ledger client
    pub retry_wait: Duration,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(20),
            retry_wait: Duration::from_millis(500),
        }
    }
}

impl RepoConfig {
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            request_timeout: std::env::var("CREDLEDGER_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default.request_timeout),
            retry_wait: std::env::var("CREDLEDGER_RETRY_WAIT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default.retry_wait),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_wait(mut self, retry_wait: Duration) -> Self {
        self.retry_wait = retry_wait;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.schedule().validate()
    }

    pub fn schedule(&self) -> PollSchedule {
        PollSchedule::new(self.request_timeout, self.retry_wait)
    }
}
