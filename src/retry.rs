//! Retry decisions and exponential backoff timing
//!
//! The policy is deliberately stateless: the executor passes the current
//! attempt number in, so concurrent logical calls can share one policy
//! without coordination. Backoff memory lives in the loop, not here.

use std::time::Duration;

use crate::classify::Classification;
use crate::config::RetryConfig;

/// Caps `multiplier^(attempt-1)`; past this the delay is pinned at
/// `max_wait` anyway and `powi` would only lose precision.
const MAX_EXPONENT: u32 = 32;

/// Decides whether another attempt is allowed and how long to wait first.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a policy from resolved configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Total attempt budget, including the first attempt.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Whether attempt `attempt` (1-based) may be followed by another.
    ///
    /// True only while budget remains and the outcome was retryable; a
    /// budget of 1 therefore never retries, regardless of classification.
    pub fn should_retry(&self, attempt: u32, class: Classification) -> bool {
        attempt < self.config.max_attempts && class.is_retryable()
    }

    /// Delay to sleep after attempt `attempt` (1-based) before the next one.
    ///
    /// `clamp(base_delay * multiplier^(attempt-1), min_wait, max_wait)`,
    /// then jittered uniformly down toward `min_wait` when jitter is on.
    /// The result never exceeds `max_wait` nor falls below `min_wait`.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
        let scaled = self.config.base_delay.as_secs_f64() * self.config.multiplier.powi(exponent as i32);
        let capped = scaled
            .min(self.config.max_wait.as_secs_f64())
            .max(self.config.min_wait.as_secs_f64());

        if self.config.jitter {
            use rand::Rng;
            let floor = self.config.min_wait.as_secs_f64();
            let jittered = rand::thread_rng().gen_range(floor..=capped);
            Duration::from_secs_f64(jittered)
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}
