//! Open -> half-open -> closed transitions driven through the executor,
//! including probe exclusivity under concurrency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tower::{service_fn, Service};

use resilient_http::{
    BreakerConfig, BreakerScope, BreakerState, ErrorKind, Executor, ExecutorConfig, FailureClass,
    RequestDescriptor, RetryConfig, TransportError, TransportResponse,
};

type TransportFuture =
    futures::future::BoxFuture<'static, Result<TransportResponse, TransportError>>;

/// Fails the first `failures` invocations immediately, then answers 200
/// after `recovery_delay`. The slow recovery keeps the probe in flight long
/// enough for other calls to arrive while the breaker is half-open.
fn recovering_upstream(
    failures: usize,
    recovery_delay: Duration,
    calls: Arc<AtomicUsize>,
) -> impl Service<RequestDescriptor, Response = TransportResponse, Error = TransportError, Future = TransportFuture>
       + Clone
       + Send
       + 'static {
    service_fn(move |_req: RequestDescriptor| {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                Err(TransportError::Connect("connection refused".into()))
            } else {
                tokio::time::sleep(recovery_delay).await;
                Ok(TransportResponse::new(200, HashMap::new(), Vec::new()))
            }
        }
        .boxed()
    })
}

fn config(failure_threshold: u32, recovery_timeout: Duration) -> ExecutorConfig {
    ExecutorConfig {
        timeout: Duration::from_secs(1),
        retry: RetryConfig {
            max_attempts: 1,
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
            min_wait: Duration::from_millis(1),
            max_wait: Duration::from_millis(5),
            retry_on: FailureClass::all().to_vec(),
            jitter: false,
        },
        breaker: BreakerConfig {
            failure_threshold,
            recovery_timeout,
        },
        breaker_scope: BreakerScope::Global,
    }
}

#[tokio::test]
async fn exactly_one_probe_is_admitted_after_recovery() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = Arc::new(Executor::new(
        recovering_upstream(1, Duration::from_millis(80), calls.clone()),
        config(1, Duration::from_millis(40)),
    ));
    let request = RequestDescriptor::get("http://upstream.test/ping");

    // trip the breaker
    let result = executor.execute(request.clone()).await;
    assert!(!result.is_success());
    assert_eq!(executor.breaker_for(&request).await.state().await, BreakerState::Open);

    // rejected while the recovery window is still running
    let result = executor.execute(request.clone()).await;
    assert_eq!(result.failure().unwrap().kind, ErrorKind::BreakerOpen);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;

    // the first call after recovery becomes the probe; a second call
    // arriving while the probe is in flight is rejected as still-open
    let probe_executor = Arc::clone(&executor);
    let probe_request = request.clone();
    let probe = tokio::spawn(async move { probe_executor.execute(probe_request).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        executor.breaker_for(&request).await.state().await,
        BreakerState::HalfOpen
    );
    let rejected = executor.execute(request.clone()).await;
    assert_eq!(rejected.failure().unwrap().kind, ErrorKind::BreakerOpen);
    assert_eq!(calls.load(Ordering::SeqCst), 2, "only the probe reached the transport");

    // probe success closes the breaker
    let result = probe.await.unwrap();
    assert!(result.is_success());
    let breaker = executor.breaker_for(&request).await;
    assert_eq!(breaker.state().await, BreakerState::Closed);
    assert_eq!(breaker.failure_count().await, 0);

    // traffic flows again
    let result = executor.execute(request).await;
    assert!(result.is_success());
}

#[tokio::test]
async fn failed_probe_reopens_the_breaker() {
    let calls = Arc::new(AtomicUsize::new(0));
    // never recovers within this test: every call fails fast
    let executor = Executor::new(
        recovering_upstream(usize::MAX, Duration::ZERO, calls.clone()),
        config(1, Duration::from_millis(30)),
    );
    let request = RequestDescriptor::get("http://upstream.test/ping");

    let _ = executor.execute(request.clone()).await;
    assert_eq!(executor.breaker_for(&request).await.state().await, BreakerState::Open);

    tokio::time::sleep(Duration::from_millis(35)).await;

    // probe admitted, fails, breaker reopens with a fresh timer
    let result = executor.execute(request.clone()).await;
    assert_ne!(result.failure().unwrap().kind, ErrorKind::BreakerOpen);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(executor.breaker_for(&request).await.state().await, BreakerState::Open);

    // immediately rejected again
    let result = executor.execute(request.clone()).await;
    assert_eq!(result.failure().unwrap().kind, ErrorKind::BreakerOpen);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // and recovers into another probe after the window
    tokio::time::sleep(Duration::from_millis(35)).await;
    let result = executor.execute(request).await;
    assert_ne!(result.failure().unwrap().kind, ErrorKind::BreakerOpen);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
