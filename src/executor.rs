//! # Executor (orientation)
//!
//! The `Executor` coordinates one logical call: it consults the circuit
//! breaker gate, drives the transport service for a single attempt under
//! the resolved timeout, classifies what came back, records it into the
//! breaker, and asks the retry policy whether to loop. Retry timing and
//! breaker memory stay independent state machines; this module only
//! sequences them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{sleep, timeout};
use tower::{Service, ServiceExt};
use tracing::{debug, info, warn};

use crate::breaker::{BreakerRegistry, CircuitBreaker};
use crate::classify::{classify, AttemptOutcome, Classification};
use crate::config::{ExecutorConfig, ExecutorOptions};
use crate::error::TransportError;
use crate::request::RequestDescriptor;
use crate::result::CallResult;
use crate::retry::RetryPolicy;
use crate::transport::TransportResponse;

/// What one gated attempt produced.
enum Attempt {
    Outcome(AttemptOutcome),
    DeadlineExpired,
}

/// Resilient request executor.
///
/// Cheap to share behind an `Arc`; concurrent logical calls interleave
/// freely and meet only inside the breaker's critical sections.
#[derive(Debug)]
pub struct Executor<S> {
    transport: S,
    config: ExecutorConfig,
    retry: RetryPolicy,
    breakers: BreakerRegistry,
}

impl<S> Executor<S>
where
    S: Service<RequestDescriptor, Response = TransportResponse, Error = TransportError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    /// Build an executor over `transport` with resolved configuration.
    ///
    /// Individually invalid config values are clamped to safe minimums;
    /// construction itself cannot fail.
    pub fn new(transport: S, config: ExecutorConfig) -> Self {
        let config = config.clamped();
        let retry = RetryPolicy::new(config.retry.clone());
        let breakers = BreakerRegistry::new(config.breaker_scope, config.breaker.clone());
        Self {
            transport,
            config,
            retry,
            breakers,
        }
    }

    /// Build an executor from raw options (defaults applied per key).
    pub fn with_options(transport: S, options: ExecutorOptions) -> Self {
        Self::new(transport, options.resolve())
    }

    /// The resolved configuration this executor runs with.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Breaker instance that gates `descriptor`, for observability.
    pub async fn breaker_for(&self, descriptor: &RequestDescriptor) -> Arc<CircuitBreaker> {
        self.breakers
            .for_target(descriptor.target_key().as_deref())
            .await
    }

    /// Execute one logical call to completion.
    ///
    /// Never returns `Err` for ordinary failure modes; everything surfaces
    /// inside the [`CallResult`].
    pub async fn execute(&self, descriptor: RequestDescriptor) -> CallResult {
        self.run(descriptor, None).await
    }

    /// Execute with a caller deadline observed during transport awaits and
    /// backoff sleeps; expiry unwinds to a `Cancelled` failure.
    pub async fn execute_with_deadline(
        &self,
        descriptor: RequestDescriptor,
        deadline: Instant,
    ) -> CallResult {
        self.run(descriptor, Some(deadline)).await
    }

    async fn run(&self, descriptor: RequestDescriptor, deadline: Option<Instant>) -> CallResult {
        let breaker = self.breaker_for(&descriptor).await;
        let attempt_timeout = descriptor.timeout.unwrap_or(self.config.timeout);
        let mut attempt: u32 = 1;
        let mut attempts_made: u32 = 0;

        loop {
            // Checked before admit() so a cancelled call never claims the
            // half-open probe slot and then abandons it.
            if let Some(deadline) = deadline {
                if deadline.saturating_duration_since(Instant::now()).is_zero() {
                    return CallResult::cancelled(attempts_made);
                }
            }

            if !breaker.admit().await {
                warn!(
                    "circuit breaker open, rejecting {} {}",
                    descriptor.method, descriptor.url
                );
                return CallResult::breaker_open(attempts_made);
            }

            debug!(
                "attempt {}/{}: {} {}",
                attempt,
                self.retry.max_attempts(),
                descriptor.method,
                descriptor.url
            );
            if let Some(body) = &descriptor.body {
                debug!("request body: {}", body);
            }

            let outcome = match self.attempt(&descriptor, attempt_timeout, deadline).await {
                Attempt::Outcome(outcome) => {
                    attempts_made += 1;
                    outcome
                }
                Attempt::DeadlineExpired => {
                    // A cancelled in-flight attempt counts as a failure so a
                    // half-open probe cannot wedge the breaker.
                    attempts_made += 1;
                    breaker.record(Classification::BreakerTrip).await;
                    warn!(
                        "deadline expired during {} {}",
                        descriptor.method, descriptor.url
                    );
                    return CallResult::cancelled(attempts_made);
                }
            };

            let class = classify(&outcome, &self.config.retry.retry_on);
            breaker.record(class).await;

            match (class, outcome) {
                (Classification::Success, AttemptOutcome::Response(response)) => {
                    if attempt > 1 {
                        info!(
                            "{} {} succeeded on attempt {}",
                            descriptor.method, descriptor.url, attempt
                        );
                    }
                    return CallResult::from_response(response, attempts_made);
                }
                (Classification::NonRetryable, outcome) => {
                    debug!(
                        "{} {} failed permanently: {}",
                        descriptor.method,
                        descriptor.url,
                        outcome.describe()
                    );
                    return CallResult::from_failure(&outcome, attempts_made);
                }
                (class, outcome) => {
                    if self.retry.should_retry(attempt, class) {
                        let delay = self.retry.next_delay(attempt);
                        warn!(
                            "attempt {} failed ({}), retrying in {:?}",
                            attempt,
                            outcome.describe(),
                            delay
                        );
                        if !wait_for_backoff(delay, deadline).await {
                            return CallResult::cancelled(attempts_made);
                        }
                        attempt += 1;
                    } else if class.is_retryable() {
                        warn!(
                            "{} {} failed after {} attempts: {}",
                            descriptor.method,
                            descriptor.url,
                            attempts_made,
                            outcome.describe()
                        );
                        return CallResult::retries_exhausted(&outcome, attempts_made);
                    } else {
                        // breaker-tripping class excluded from the retryable set
                        return CallResult::from_failure(&outcome, attempts_made);
                    }
                }
            }
        }
    }

    /// Drive one transport attempt under the resolved timeout, capped by
    /// the caller deadline when one is closer.
    async fn attempt(
        &self,
        descriptor: &RequestDescriptor,
        attempt_timeout: Duration,
        deadline: Option<Instant>,
    ) -> Attempt {
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        let deadline_is_closer = matches!(remaining, Some(r) if r < attempt_timeout);
        let wait = match remaining {
            Some(r) if r < attempt_timeout => r,
            _ => attempt_timeout,
        };

        let transport = self.transport.clone();
        match timeout(wait, transport.oneshot(descriptor.clone())).await {
            Ok(Ok(response)) => Attempt::Outcome(AttemptOutcome::Response(response)),
            Ok(Err(err)) => Attempt::Outcome(AttemptOutcome::TransportFailed(err)),
            Err(_) if deadline_is_closer => Attempt::DeadlineExpired,
            Err(_) => Attempt::Outcome(AttemptOutcome::TransportFailed(TransportError::Timeout(
                attempt_timeout,
            ))),
        }
    }
}

/// Sleep the backoff delay, truncated by the caller deadline.
///
/// Returns false when the deadline fired first. No locks are held here;
/// other logical calls proceed while this one waits.
async fn wait_for_backoff(delay: Duration, deadline: Option<Instant>) -> bool {
    match deadline {
        None => {
            sleep(delay).await;
            true
        }
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining <= delay {
                sleep(remaining).await;
                false
            } else {
                sleep(delay).await;
                true
            }
        }
    }
}
