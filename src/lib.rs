//! # Resilient HTTP request execution
//!
//! A small Tower-based library that wraps one logical outbound HTTP call
//! with a retry policy and a circuit breaker, so transient upstream
//! failures are absorbed and persistent ones are isolated before they
//! cascade.
//!
//! ## Core Concepts
//!
//! - **Executor**: drives one logical call through the breaker gate, the
//!   transport, outcome classification, and the retry loop
//! - **Transport seam**: any `tower::Service<RequestDescriptor>` works;
//!   [`ReqwestTransport`] is the batteries-included default, and
//!   `tower::service_fn` fakes slot in for tests
//! - **Circuit breaker**: shared failure memory across calls, scoped
//!   globally or per target host
//! - **Retry policy**: per-call exponential backoff with jitter, kept
//!   independent from the breaker's cross-call state
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use resilient_http::{Executor, ExecutorOptions, ReqwestTransport, RequestDescriptor};
//!
//! # async fn example() {
//! let executor = Executor::with_options(ReqwestTransport::new(), ExecutorOptions::default());
//!
//! let request = RequestDescriptor::post("https://api.example.com/posts")
//!     .with_body(serde_json::json!({"title": "foo", "body": "bar"}));
//!
//! let result = executor.execute(request).await;
//! match result {
//!     resilient_http::CallResult::Success(payload) => {
//!         println!("{}: {:?}", payload.status, payload.json);
//!     }
//!     resilient_http::CallResult::Failure(failure) => {
//!         eprintln!("{} after {} attempts: {}", failure.code(), failure.attempts, failure.message);
//!     }
//! }
//! # }
//! ```

pub mod breaker;
pub mod classify;
pub mod config;
pub mod error;
pub mod executor;
pub mod request;
pub mod result;
pub mod retry;
pub mod transport;

pub use breaker::{BreakerState, CircuitBreaker};
pub use classify::{classify, AttemptOutcome, Classification, FailureClass};
pub use config::{BreakerConfig, BreakerScope, ExecutorConfig, ExecutorOptions, RetryConfig};
pub use error::{ErrorKind, TransportError};
pub use executor::Executor;
pub use request::{Method, RequestDescriptor};
pub use result::{CallFailure, CallResult, ResponsePayload};
pub use retry::RetryPolicy;
pub use transport::{ReqwestTransport, TransportResponse};
