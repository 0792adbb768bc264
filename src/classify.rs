//! Attempt outcome classification
//!
//! Pure decision logic shared by the retry loop and the circuit breaker:
//! given what one transport attempt produced, decide whether it is a
//! success, something worth retrying, something that should only count
//! against the breaker, or a permanent failure. No side effects here; the
//! executor feeds the result into the breaker and the retry policy.

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::transport::TransportResponse;

/// Failure classes a retry policy can opt in or out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Connection, DNS, or TLS failure
    Transport,
    /// Attempt deadline elapsed
    Timeout,
    /// HTTP 429
    RateLimited,
    /// HTTP 500-599
    ServerError,
}

impl FailureClass {
    /// Every class, the default retryable set.
    pub fn all() -> [FailureClass; 4] {
        [
            FailureClass::Transport,
            FailureClass::Timeout,
            FailureClass::RateLimited,
            FailureClass::ServerError,
        ]
    }
}

/// What one transport attempt produced.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The transport returned an HTTP response, any status
    Response(TransportResponse),
    /// The transport failed before producing a response
    TransportFailed(TransportError),
}

impl AttemptOutcome {
    /// HTTP status, when a response was produced.
    pub fn status(&self) -> Option<u16> {
        match self {
            AttemptOutcome::Response(resp) => Some(resp.status),
            AttemptOutcome::TransportFailed(_) => None,
        }
    }

    /// One-line description for failure messages and logs.
    pub fn describe(&self) -> String {
        match self {
            AttemptOutcome::Response(resp) => format!("http status {}", resp.status),
            AttemptOutcome::TransportFailed(err) => err.to_string(),
        }
    }
}

/// How an attempt outcome is treated by the retry loop and the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 2xx/3xx response; resets the breaker failure counter
    Success,
    /// Transient failure: retried, and counts toward the breaker threshold
    Retryable,
    /// Counts toward the breaker threshold but is not retried because its
    /// failure class is excluded from the retryable set
    BreakerTrip,
    /// Permanent failure (4xx other than 429): not retried, breaker untouched
    NonRetryable,
}

impl Classification {
    /// Whether the retry policy may schedule another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, Classification::Retryable)
    }

    /// Whether the outcome counts toward the breaker's failure threshold.
    pub fn trips_breaker(self) -> bool {
        matches!(self, Classification::Retryable | Classification::BreakerTrip)
    }
}

/// Classify one attempt outcome.
///
/// Priority order: transport failures and timeouts first, then 429/5xx,
/// then the 2xx/3xx success band; everything left (4xx except 429) is
/// permanent. `retry_on` narrows which failure classes are retryable; a
/// class outside the set still counts toward the breaker.
pub fn classify(outcome: &AttemptOutcome, retry_on: &[FailureClass]) -> Classification {
    let class = match outcome {
        AttemptOutcome::TransportFailed(err) => {
            if err.is_timeout() {
                FailureClass::Timeout
            } else {
                FailureClass::Transport
            }
        }
        AttemptOutcome::Response(resp) => match resp.status {
            200..=399 => return Classification::Success,
            429 => FailureClass::RateLimited,
            500..=599 => FailureClass::ServerError,
            _ => return Classification::NonRetryable,
        },
    };
    if retry_on.contains(&class) {
        Classification::Retryable
    } else {
        Classification::BreakerTrip
    }
}
