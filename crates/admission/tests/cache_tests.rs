//! Cache and shared rate limit integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use admission::cache::CacheStore;
use admission::deadline::Deadline;
use admission::errors::CacheError;
use admission::rate_limit::{RateLimiter, WindowCounterLimiter};
use admission_test_utils::{mock_store, FailureMode, TEST_CACHE_OP_TIMEOUT};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn test_window_limit_shared_between_instances() -> Result<(), anyhow::Error> {
    let store = CacheStore::in_memory(Duration::from_secs(1));
    let first = WindowCounterLimiter::new(store.clone(), "ratelimit:api", 3, Duration::from_secs(60));
    let second = WindowCounterLimiter::new(store, "ratelimit:api", 3, Duration::from_secs(60));

    let now = 1_700_000_000;
    assert!(first.allow_at(now).await);
    assert!(second.allow_at(now).await);
    assert!(first.allow_at(now + 1).await);
    assert!(!second.allow_at(now + 2).await);
    assert!(!first.allow_at(now + 3).await);

    // Next window starts from zero
    assert!(first.allow_at(now + 60).await);
    Ok(())
}

#[tokio::test]
async fn test_window_limiter_fails_open() {
    let (store, _backend) = mock_store(FailureMode::Unavailable);
    let limiter = WindowCounterLimiter::new(store, "ratelimit:api", 1, Duration::from_secs(60));

    for _ in 0..5 {
        assert!(limiter.allow().await);
    }
}

#[tokio::test]
async fn test_get_or_compute_survives_failed_write() -> Result<(), anyhow::Error> {
    let (store, backend) = mock_store(FailureMode::FailWrites);
    let calls = AtomicUsize::new(0);
    let calls = &calls;

    for _ in 0..2 {
        let value: Result<String, CacheError> = store
            .get_or_compute("user:1", Duration::from_secs(60), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("Ann".to_string())
            })
            .await;
        assert_eq!(value?, "Ann");
    }

    // Nothing was cached, so both calls computed
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(backend.call_count(), 4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stalled_backend_bounded_by_op_timeout() {
    let (store, _backend) = mock_store(FailureMode::Stalled);
    let start = tokio::time::Instant::now();

    let result = store.get("k").await;

    assert!(matches!(result, Err(CacheError::BackendUnavailable(_))));
    assert_eq!(start.elapsed(), TEST_CACHE_OP_TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn test_request_deadline_tighter_than_op_timeout() {
    let (store, _backend) = mock_store(FailureMode::Stalled);
    let deadline = Deadline::after(Duration::from_millis(50));
    let start = tokio::time::Instant::now();

    let result = store.with_deadline(&deadline).exists("k").await;

    assert!(matches!(result, Err(CacheError::BackendUnavailable(_))));
    assert_eq!(start.elapsed(), Duration::from_millis(50));
}
