//! Conflict-retry budget derived from an operation timeout

use std::time::Duration;

use cloud_api::RequestOpts;

/// Fixed sleep between attempts rejected with a conflicting operation.
pub const CONFLICT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Attempt budget for one mutating call. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictRetryConfig {
    /// Total attempts, at least one.
    pub amount: u32,
    pub interval: Duration,
}

impl ConflictRetryConfig {
    /// Spread the timeout over fixed-interval attempts.
    ///
    /// `amount * interval` never exceeds the timeout once it covers at least one
    /// interval; shorter timeouts degrade to a single attempt.
    pub fn from_timeout(timeout: Duration) -> Self {
        let amount = timeout.as_secs() / CONFLICT_RETRY_INTERVAL.as_secs();
        Self {
            amount: u32::try_from(amount).unwrap_or(u32::MAX).max(1),
            interval: CONFLICT_RETRY_INTERVAL,
        }
    }

    pub fn request_opts(&self) -> RequestOpts {
        RequestOpts {
            conflict_retry_amount: self.amount,
            conflict_retry_interval: self.interval,
        }
    }
}
