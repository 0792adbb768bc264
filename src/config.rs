//! Configuration for the executor
//!
//! Two layers: [`ExecutorOptions`] is the raw bag of recognized keys as they
//! arrive from whatever resolved them (file, environment, hardcoded), every
//! key optional; [`ExecutorConfig`] is the immutable, fully-defaulted form
//! the executor actually runs with. Individually invalid values are clamped
//! to safe minimums at resolution time rather than raising a construction
//! error.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::FailureClass;

/// Scope of circuit-breaker sharing across logical calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BreakerScope {
    /// One breaker shared by every call through the executor
    #[default]
    Global,
    /// One breaker per `scheme://host:port` target, created lazily
    PerHost,
}

/// Retry behavior for one executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempt budget per logical call, including the first attempt
    pub max_attempts: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Exponential growth factor applied per attempt
    pub multiplier: f64,

    /// Lower clamp on every backoff delay
    pub min_wait: Duration,

    /// Upper clamp on every backoff delay
    pub max_wait: Duration,

    /// Failure classes eligible for retry
    pub retry_on: Vec<FailureClass>,

    /// Randomize each delay within its bound to avoid synchronized
    /// retry storms across concurrent callers
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(10),
            retry_on: FailureClass::all().to_vec(),
            jitter: true,
        }
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive breaker-tripping failures that open the breaker
    pub failure_threshold: u32,

    /// How long the breaker stays open before admitting a probe
    pub recovery_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Fully-resolved executor configuration, immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Per-attempt timeout unless the descriptor overrides it
    pub timeout: Duration,

    /// Retry policy configuration
    pub retry: RetryConfig,

    /// Circuit breaker configuration
    pub breaker: BreakerConfig,

    /// How breaker state is shared across calls
    pub breaker_scope: BreakerScope,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            retry: RetryConfig::default(),
            breaker: BreakerConfig::default(),
            breaker_scope: BreakerScope::default(),
        }
    }
}

impl ExecutorConfig {
    /// Clamp individually invalid values to safe minimums.
    ///
    /// Threshold and attempt budgets floor at 1, the multiplier floors at
    /// 1.0, a zero timeout becomes the default, and `max_wait` is raised to
    /// `min_wait` when the two are inverted.
    pub(crate) fn clamped(mut self) -> Self {
        if self.timeout.is_zero() {
            self.timeout = default_timeout();
        }
        self.retry.max_attempts = self.retry.max_attempts.max(1);
        if !(self.retry.multiplier >= 1.0) {
            self.retry.multiplier = 1.0;
        }
        if self.retry.max_wait < self.retry.min_wait {
            self.retry.max_wait = self.retry.min_wait;
        }
        self.breaker.failure_threshold = self.breaker.failure_threshold.max(1);
        self
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Recognized configuration keys, every one optional.
///
/// This is the inbound shape for callers that resolve configuration
/// externally; [`resolve`](ExecutorOptions::resolve) applies defaults and
/// clamping to produce an [`ExecutorConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorOptions {
    /// Per-attempt timeout
    pub timeout: Option<Duration>,
    /// Consecutive failures that open the breaker
    pub circuit_failure_threshold: Option<u32>,
    /// Open-to-half-open transition delay
    pub circuit_recovery_timeout: Option<Duration>,
    /// Total attempt budget per logical call
    pub retry_attempts: Option<u32>,
    /// Exponential growth factor
    pub retry_multiplier: Option<f64>,
    /// Lower clamp on backoff delays
    pub retry_min_wait: Option<Duration>,
    /// Upper clamp on backoff delays
    pub retry_max_wait: Option<Duration>,
    /// Breaker sharing scope
    pub breaker_scope: Option<BreakerScope>,
}

impl ExecutorOptions {
    /// Apply defaults for absent keys and clamp invalid values.
    pub fn resolve(self) -> ExecutorConfig {
        let defaults = ExecutorConfig::default();
        ExecutorConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            retry: RetryConfig {
                max_attempts: self.retry_attempts.unwrap_or(defaults.retry.max_attempts),
                multiplier: self.retry_multiplier.unwrap_or(defaults.retry.multiplier),
                min_wait: self.retry_min_wait.unwrap_or(defaults.retry.min_wait),
                max_wait: self.retry_max_wait.unwrap_or(defaults.retry.max_wait),
                ..defaults.retry
            },
            breaker: BreakerConfig {
                failure_threshold: self
                    .circuit_failure_threshold
                    .unwrap_or(defaults.breaker.failure_threshold),
                recovery_timeout: self
                    .circuit_recovery_timeout
                    .unwrap_or(defaults.breaker.recovery_timeout),
            },
            breaker_scope: self.breaker_scope.unwrap_or_default(),
        }
        .clamped()
    }
}
