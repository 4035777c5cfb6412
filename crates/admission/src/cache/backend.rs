//! Backing store abstraction for [`CacheStore`](super::CacheStore).
//!
//! Implementations talk to the external store and nothing else: timeouts,
//! value encoding and metrics live in `CacheStore`.

use crate::errors::CacheError;
use std::time::Duration;

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist (or has expired).
    Missing,
    /// Key exists without an expiry.
    Persistent,
    /// Key expires after this long.
    Expires(Duration),
}

/// Key/value store with TTLs and atomic counters.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Value for `key`, `None` on miss.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl, CacheError>;

    /// Set the expiry of an existing key. Returns false if the key is missing.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Increment the counter at `key` and (re)set its expiry in one atomic step.
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, CacheError>;

    /// Liveness check.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Mock backends for testing.
///
/// Each wraps an in-memory backend and injects one kind of failure.
pub mod mock {
    use super::*;
    use crate::cache::memory::InMemoryCacheBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Failure mode injected by [`MockCacheBackend`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FailureMode {
        /// Behaves like the in-memory backend.
        None,
        /// Reads fail; writes succeed.
        FailReads,
        /// Writes fail; reads succeed.
        FailWrites,
        /// Every call fails.
        Unavailable,
        /// Every call hangs forever.
        Stalled,
    }

    /// In-memory backend with injected failures and call counting.
    pub struct MockCacheBackend {
        inner: InMemoryCacheBackend,
        mode: FailureMode,
        calls: AtomicUsize,
    }

    impl MockCacheBackend {
        pub fn new(mode: FailureMode) -> Self {
            Self {
                inner: InMemoryCacheBackend::new(),
                mode,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn healthy() -> Self {
            Self::new(FailureMode::None)
        }

        pub fn failing_reads() -> Self {
            Self::new(FailureMode::FailReads)
        }

        pub fn failing_writes() -> Self {
            Self::new(FailureMode::FailWrites)
        }

        pub fn unavailable() -> Self {
            Self::new(FailureMode::Unavailable)
        }

        pub fn stalled() -> Self {
            Self::new(FailureMode::Stalled)
        }

        /// Number of backend calls made.
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn check(&self, is_write: bool) -> Result<(), CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let fails = match self.mode {
                FailureMode::None => false,
                FailureMode::FailReads => !is_write,
                FailureMode::FailWrites => is_write,
                FailureMode::Unavailable => true,
                FailureMode::Stalled => {
                    std::future::pending::<()>().await;
                    false
                }
            };

            if fails {
                return Err(CacheError::BackendUnavailable(
                    "Mock cache backend error".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl CacheBackend for MockCacheBackend {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.check(false).await?;
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
            self.check(true).await?;
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<bool, CacheError> {
            self.check(true).await?;
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> Result<bool, CacheError> {
            self.check(false).await?;
            self.inner.exists(key).await
        }

        async fn ttl(&self, key: &str) -> Result<KeyTtl, CacheError> {
            self.check(false).await?;
            self.inner.ttl(key).await
        }

        async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
            self.check(true).await?;
            self.inner.expire(key, ttl).await
        }

        async fn increment_with_expiry(
            &self,
            key: &str,
            ttl: Duration,
        ) -> Result<i64, CacheError> {
            self.check(true).await?;
            self.inner.increment_with_expiry(key, ttl).await
        }

        async fn ping(&self) -> Result<(), CacheError> {
            self.check(false).await?;
            self.inner.ping().await
        }
    }
}
