//! Retry policy: decides transport-level backoff delays.
//!
//! One policy object, injected into the executor. The scheduler itself never
//! retries anything — ordinary failures are at-most-one-attempt-per-run.

use std::time::Duration;

/// Retry policy for transient transport failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Default for HTTP calls: one retry after a short pause.
    pub fn default_http() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }

    /// Delay before the next retry: `base_delay * multiplier^(attempts - 1)`,
    /// where `attempts` is the number already made (1-indexed).
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(attempts.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay_secs)
    }
}
