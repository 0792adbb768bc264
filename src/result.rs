//! Caller-facing call results
//!
//! The terminal value of a logical call. A [`CallResult`] is a two-variant
//! enum, so exactly one of success/failure exists by construction. The
//! constructors here are the result builder: they normalize the executor's
//! terminal state into the payload or structured error the caller sees.

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::classify::AttemptOutcome;
use crate::error::{ErrorKind, TransportError};
use crate::transport::TransportResponse;

/// Successful response payload.
#[derive(Debug, Clone)]
pub struct ResponsePayload {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
    /// Raw response body
    pub body: Vec<u8>,
    /// Body decoded as JSON when the content type indicated it
    pub json: Option<Value>,
    /// Transport attempts made for this call
    pub attempts: u32,
}

impl ResponsePayload {
    /// Body as text, lossily decoded.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Structured terminal failure.
#[derive(Debug, Clone)]
pub struct CallFailure {
    /// Failure taxonomy entry
    pub kind: ErrorKind,
    /// Human-readable description, including the last observed failure
    pub message: String,
    /// Transport attempts made before giving up
    pub attempts: u32,
    /// Whether the call was rejected by an open breaker
    pub breaker_open: bool,
    /// HTTP status of the failing response, when one exists
    pub status: Option<u16>,
}

impl CallFailure {
    /// Stable wire-style code: `CIRCUIT_BREAKER_OPEN`, `HTTP_404`,
    /// `RETRIES_EXHAUSTED`, ...
    pub fn code(&self) -> String {
        match self.kind {
            ErrorKind::BreakerOpen => "CIRCUIT_BREAKER_OPEN".to_string(),
            ErrorKind::HttpStatus => format!("HTTP_{}", self.status.unwrap_or(0)),
            ErrorKind::Transport => "TRANSPORT_ERROR".to_string(),
            ErrorKind::Timeout => "TIMEOUT".to_string(),
            ErrorKind::RetriesExhausted => "RETRIES_EXHAUSTED".to_string(),
            ErrorKind::Cancelled => "CANCELLED".to_string(),
        }
    }
}

/// Terminal outcome of one logical call.
#[derive(Debug, Clone)]
pub enum CallResult {
    /// The upstream answered within the success band
    Success(ResponsePayload),
    /// The call failed; see [`CallFailure`] for kind and attempt count
    Failure(CallFailure),
}

impl CallResult {
    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success(_))
    }

    /// The payload, when successful.
    pub fn success(&self) -> Option<&ResponsePayload> {
        match self {
            CallResult::Success(payload) => Some(payload),
            CallResult::Failure(_) => None,
        }
    }

    /// The failure, when failed.
    pub fn failure(&self) -> Option<&CallFailure> {
        match self {
            CallResult::Success(_) => None,
            CallResult::Failure(failure) => Some(failure),
        }
    }

    /// Transport attempts made for this call.
    pub fn attempts(&self) -> u32 {
        match self {
            CallResult::Success(payload) => payload.attempts,
            CallResult::Failure(failure) => failure.attempts,
        }
    }

    /// Build the success payload, decoding a JSON body best-effort.
    ///
    /// A body that fails to decode is surfaced raw with a diagnostic;
    /// decode failure is not a request failure.
    pub(crate) fn from_response(response: TransportResponse, attempts: u32) -> Self {
        let is_json = response
            .content_type()
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);
        let json = if is_json && !response.body.is_empty() {
            match serde_json::from_slice(&response.body) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(
                        "response body declared json but failed to decode: {}",
                        err
                    );
                    None
                }
            }
        } else {
            None
        };
        CallResult::Success(ResponsePayload {
            status: response.status,
            headers: response.headers,
            body: response.body,
            json,
            attempts,
        })
    }

    /// Rejection by an open breaker; no transport call was made for it.
    pub(crate) fn breaker_open(attempts: u32) -> Self {
        CallResult::Failure(CallFailure {
            kind: ErrorKind::BreakerOpen,
            message: "service temporarily unavailable: circuit breaker open".to_string(),
            attempts,
            breaker_open: true,
            status: None,
        })
    }

    /// The retry budget ran out on a retryable failure.
    pub(crate) fn retries_exhausted(last: &AttemptOutcome, attempts: u32) -> Self {
        CallResult::Failure(CallFailure {
            kind: ErrorKind::RetriesExhausted,
            message: format!(
                "retries exhausted after {} attempts, last failure: {}",
                attempts,
                last.describe()
            ),
            attempts,
            breaker_open: false,
            status: last.status(),
        })
    }

    /// Terminal failure taken directly from the attempt outcome: a
    /// non-retryable status, or a failure class excluded from retry.
    pub(crate) fn from_failure(outcome: &AttemptOutcome, attempts: u32) -> Self {
        let (kind, status) = match outcome {
            AttemptOutcome::Response(resp) => (ErrorKind::HttpStatus, Some(resp.status)),
            AttemptOutcome::TransportFailed(TransportError::Timeout(_)) => {
                (ErrorKind::Timeout, None)
            }
            AttemptOutcome::TransportFailed(_) => (ErrorKind::Transport, None),
        };
        CallResult::Failure(CallFailure {
            kind,
            message: outcome.describe(),
            attempts,
            breaker_open: false,
            status,
        })
    }

    /// The caller's deadline expired mid-call.
    pub(crate) fn cancelled(attempts: u32) -> Self {
        CallResult::Failure(CallFailure {
            kind: ErrorKind::Cancelled,
            message: "call cancelled: deadline expired".to_string(),
            attempts,
            breaker_open: false,
            status: None,
        })
    }
}
