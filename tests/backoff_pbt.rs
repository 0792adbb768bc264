//! Property tests for backoff timing bounds.

use std::time::Duration;

use proptest::prelude::*;
use resilient_http::{RetryConfig, RetryPolicy};

fn policy(base_ms: u64, multiplier: f64, min_ms: u64, max_ms: u64, jitter: bool) -> RetryPolicy {
    RetryPolicy::new(RetryConfig {
        max_attempts: 10,
        base_delay: Duration::from_millis(base_ms),
        multiplier,
        min_wait: Duration::from_millis(min_ms),
        max_wait: Duration::from_millis(max_ms),
        jitter,
        ..RetryConfig::default()
    })
}

proptest! {
    #[test]
    fn delays_are_monotonically_non_decreasing_until_clamped(
        base_ms in 1u64..1_000,
        multiplier in 1.0f64..4.0,
        min_ms in 1u64..500,
        span_ms in 1u64..10_000,
        attempt in 1u32..20,
    ) {
        let policy = policy(base_ms, multiplier, min_ms, min_ms + span_ms, false);
        prop_assert!(policy.next_delay(attempt) <= policy.next_delay(attempt + 1));
    }

    #[test]
    fn delays_stay_within_the_configured_bounds(
        base_ms in 1u64..1_000,
        multiplier in 1.0f64..4.0,
        min_ms in 1u64..500,
        span_ms in 1u64..10_000,
        attempt in 1u32..50,
        jitter in any::<bool>(),
    ) {
        let min = Duration::from_millis(min_ms);
        let max = Duration::from_millis(min_ms + span_ms);
        let policy = policy(base_ms, multiplier, min_ms, min_ms + span_ms, jitter);
        let delay = policy.next_delay(attempt);
        prop_assert!(delay >= min, "delay {delay:?} under min {min:?}");
        prop_assert!(delay <= max, "delay {delay:?} over max {max:?}");
    }
}

// Note: Keep PBT light to avoid long CI times; curated delay shapes live in
// the retry module's unit tests.
