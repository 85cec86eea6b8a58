//! Unit tests for the backoff retrier

use std::sync::{Arc, Mutex};

use ad_report_client::client::{ClientError, Retrier, RetryPolicy};

/// Helper struct to track operation invocations
#[derive(Clone)]
struct CallTracker {
    call_count: Arc<Mutex<usize>>,
}

impl CallTracker {
    fn new() -> Self {
        Self {
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    fn get_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    fn increment(&self) {
        *self.call_count.lock().unwrap() += 1;
    }
}

#[tokio::test(start_paused = true)]
async fn persistent_transient_failure_uses_full_budget() {
    let tracker = CallTracker::new();
    let retrier = Retrier::new(RetryPolicy::new(3, 1));

    let t = tracker.clone();
    let result: Result<(), ClientError> = retrier
        .execute(|| {
            let t = t.clone();
            async move {
                t.increment();
                Err(ClientError::Connection("refused".into()))
            }
        })
        .await;

    assert!(matches!(result, Err(ClientError::RetryLimitExceeded)));
    // Initial attempt plus one invocation per allowed retry.
    assert_eq!(tracker.get_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn recovers_after_transient_failures() {
    let tracker = CallTracker::new();
    let retrier = Retrier::new(RetryPolicy::new(5, 1));

    let t = tracker.clone();
    let result: Result<u32, ClientError> = retrier
        .execute(|| {
            let t = t.clone();
            async move {
                t.increment();
                if t.get_count() < 3 {
                    Err(ClientError::ServerUnavailable("maintenance".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 7);
    assert_eq!(tracker.get_count(), 3);
}

#[tokio::test]
async fn non_transient_error_propagates_without_retry() {
    let tracker = CallTracker::new();
    let retrier = Retrier::new(RetryPolicy::new(5, 1));

    let t = tracker.clone();
    let result: Result<(), ClientError> = retrier
        .execute(|| {
            let t = t.clone();
            async move {
                t.increment();
                Err(ClientError::Api("bad request".into()))
            }
        })
        .await;

    assert!(matches!(result, Err(ClientError::Api(_))));
    assert_eq!(tracker.get_count(), 1);
}

#[tokio::test]
async fn immediate_success_calls_once() {
    let tracker = CallTracker::new();
    let retrier = Retrier::new(RetryPolicy::default());

    let t = tracker.clone();
    let result: Result<&str, ClientError> = retrier
        .execute(|| {
            let t = t.clone();
            async move {
                t.increment();
                Ok("ok")
            }
        })
        .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(tracker.get_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_between_attempts() {
    let retrier = Retrier::new(RetryPolicy::new(2, 2));

    let start = tokio::time::Instant::now();
    let result: Result<(), ClientError> = retrier
        .execute(|| async { Err(ClientError::Protocol("reset".into())) })
        .await;

    assert!(matches!(result, Err(ClientError::RetryLimitExceeded)));
    // Delays of 2s and 4s precede the second and third invocations.
    assert_eq!(start.elapsed().as_secs(), 6);
}
