//! Error types for the executor

use std::time::Duration;

use thiserror::Error;

/// Transport-level failure surfaced by a transport service.
///
/// These are the failures that happen before an HTTP status exists:
/// connection establishment, name resolution, TLS, or the attempt deadline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Name resolution failed
    #[error("dns resolution failed: {0}")]
    Dns(String),

    /// TLS negotiation failed
    #[error("tls handshake failed: {0}")]
    Tls(String),

    /// The attempt exceeded its deadline
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Any other transport-level failure
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether this failure is the attempt deadline elapsing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

/// Caller-facing failure taxonomy reported in [`CallFailure`](crate::result::CallFailure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection, DNS, or TLS failure
    Transport,
    /// An attempt exceeded its deadline
    Timeout,
    /// Non-retryable HTTP status
    HttpStatus,
    /// Rejected by an open circuit breaker without a transport call
    BreakerOpen,
    /// All retryable attempts were consumed
    RetriesExhausted,
    /// The caller's deadline expired mid-call
    Cancelled,
}

impl ErrorKind {
    /// Stable identifier for logs and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::HttpStatus => "http-status",
            ErrorKind::BreakerOpen => "breaker-open",
            ErrorKind::RetriesExhausted => "retries-exhausted",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
