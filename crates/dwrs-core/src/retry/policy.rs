use std::time::Duration;

use crate::task::ErrorClass;

/// Upper bound on the backoff exponent.
const MAX_DOUBLINGS: u32 = 16;

/// Attempt budget and backoff, built from the `[retry]` config table
/// (see [`RetryConfig::to_policy`](crate::config::RetryConfig::to_policy)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per file, the first one included.
    pub max_attempts: u32,
    /// Wait before the first retry.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1 = first retry): `base * 2^(retry-1)`, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let doublings = retry.saturating_sub(1).min(MAX_DOUBLINGS);
        self.base_delay
            .saturating_mul(1u32 << doublings)
            .min(self.max_delay)
    }

    /// How long to wait before another attempt, given that `attempts_made`
    /// attempts have run and the last one failed with `class`.
    ///
    /// `None` when the class is final or the budget is spent.
    pub fn next_delay(&self, attempts_made: u32, class: ErrorClass) -> Option<Duration> {
        if !class.is_transient() || attempts_made >= self.max_attempts {
            return None;
        }
        Some(self.backoff(attempts_made))
    }
}
