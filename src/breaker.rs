//! Circuit breaker: shared failure memory across logical calls
//!
//! One breaker instance is shared by every call targeting it (globally or
//! per host, see [`BreakerScope`](crate::config::BreakerScope)). The state
//! machine is closed -> open -> half-open -> closed; all reads and writes of
//! the counter and state happen under a single mutex so that a
//! read-then-write is atomic as a unit: two concurrent calls cannot both
//! observe a stale closed state and double-trip, and at most one call ever
//! occupies the half-open probe slot. Only `admit` and `record` take the
//! lock; transport awaits and backoff sleeps happen outside it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::classify::Classification;
use crate::config::{BreakerConfig, BreakerScope};

/// Observable breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests pass through; failures increment the counter
    Closed,
    /// Requests are rejected without a transport call
    Open,
    /// A single probe is in flight; other requests are rejected
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Closed,
    Open { since: Instant },
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: State,
    consecutive_failures: u32,
}

/// Per-target circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// New breaker in the closed state.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
            }),
        }
    }

    /// Gate one attempt.
    ///
    /// Closed admits. Open admits only once the recovery timeout has
    /// elapsed, transitioning to half-open so the admitted call becomes the
    /// probe; until the probe's outcome is recorded, every other caller is
    /// rejected as still-open.
    pub async fn admit(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::Closed => true,
            State::HalfOpen => false,
            State::Open { since } => {
                if since.elapsed() >= self.config.recovery_timeout {
                    debug!("circuit breaker half-open, admitting probe");
                    inner.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Fold one classified attempt outcome into the state machine.
    ///
    /// Success resets the counter and closes from any state. A
    /// breaker-tripping failure increments the counter when closed (opening
    /// at the threshold) and reopens from half-open with a fresh recovery
    /// timer. Non-retryable outcomes leave the breaker untouched.
    pub async fn record(&self, class: Classification) {
        match class {
            Classification::NonRetryable => {}
            Classification::Success => {
                let mut inner = self.inner.lock().await;
                inner.consecutive_failures = 0;
                if !matches!(inner.state, State::Closed) {
                    debug!("circuit breaker closed after successful probe");
                }
                inner.state = State::Closed;
            }
            Classification::Retryable | Classification::BreakerTrip => {
                let mut inner = self.inner.lock().await;
                match inner.state {
                    State::HalfOpen => {
                        warn!("circuit breaker probe failed, reopening");
                        inner.state = State::Open {
                            since: Instant::now(),
                        };
                    }
                    State::Closed => {
                        inner.consecutive_failures += 1;
                        if inner.consecutive_failures >= self.config.failure_threshold {
                            warn!(
                                "circuit breaker tripped after {} consecutive failures",
                                inner.consecutive_failures
                            );
                            inner.state = State::Open {
                                since: Instant::now(),
                            };
                        }
                    }
                    // Already open: the tail of an attempt admitted before
                    // the trip. The recovery timer is not extended.
                    State::Open { .. } => {}
                }
            }
        }
    }

    /// Current state, for observability and tests.
    pub async fn state(&self) -> BreakerState {
        match self.inner.lock().await.state {
            State::Closed => BreakerState::Closed,
            State::Open { .. } => BreakerState::Open,
            State::HalfOpen => BreakerState::HalfOpen,
        }
    }

    /// Consecutive breaker-tripping failures since the last success.
    pub async fn failure_count(&self) -> u32 {
        self.inner.lock().await.consecutive_failures
    }
}

/// Key for requests whose URL yields no `scheme://host:port` target.
const FALLBACK_TARGET: &str = "unresolved";

/// Breakers keyed by request target, per the configured scope.
#[derive(Debug)]
pub(crate) enum BreakerRegistry {
    Global(Arc<CircuitBreaker>),
    PerHost {
        config: BreakerConfig,
        by_target: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    },
}

impl BreakerRegistry {
    pub(crate) fn new(scope: BreakerScope, config: BreakerConfig) -> Self {
        match scope {
            BreakerScope::Global => BreakerRegistry::Global(Arc::new(CircuitBreaker::new(config))),
            BreakerScope::PerHost => BreakerRegistry::PerHost {
                config,
                by_target: Mutex::new(HashMap::new()),
            },
        }
    }

    /// Breaker instance for `target`, created lazily under per-host scope.
    pub(crate) async fn for_target(&self, target: Option<&str>) -> Arc<CircuitBreaker> {
        match self {
            BreakerRegistry::Global(breaker) => Arc::clone(breaker),
            BreakerRegistry::PerHost { config, by_target } => {
                let mut map = by_target.lock().await;
                Arc::clone(
                    map.entry(target.unwrap_or(FALLBACK_TARGET).to_string())
                        .or_insert_with(|| Arc::new(CircuitBreaker::new(config.clone()))),
                )
            }
        }
    }
}
