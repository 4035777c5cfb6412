//! Cache-aside accessor.
//!
//! `CacheStore` owns no cached data: the backing store is the source of truth
//! and may evict entries on its own. Every round-trip is bounded by the
//! operation timeout, and by the request deadline when the store is scoped to
//! one with [`CacheStore::with_deadline`].
//!
//! Values are stored as text: strings as-is, everything else as JSON.

use crate::cache::backend::{CacheBackend, KeyTtl};
use crate::cache::memory::InMemoryCacheBackend;
use crate::cache::redis::RedisCacheBackend;
use crate::deadline::Deadline;
use crate::errors::CacheError;
use crate::observability::metrics::record_cache_operation;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default bound on a single cache round-trip.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Cache accessor configuration.
#[derive(Clone)]
pub struct CacheConfig {
    /// May contain credentials; redacted in Debug.
    pub redis_url: String,
    pub op_timeout: Duration,
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("redis_url", &"[REDACTED]")
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

/// Thin, cloneable client over a [`CacheBackend`].
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    op_timeout: Duration,
    deadline: Option<Deadline>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, op_timeout: Duration) -> Self {
        Self {
            backend,
            op_timeout,
            deadline: None,
        }
    }

    /// Connect to the Redis instance named in `config`.
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        let backend = RedisCacheBackend::connect(&config.redis_url).await?;
        Ok(Self::new(Arc::new(backend), config.op_timeout))
    }

    /// Store backed by process-local memory.
    pub fn in_memory(op_timeout: Duration) -> Self {
        Self::new(Arc::new(InMemoryCacheBackend::new()), op_timeout)
    }

    /// View of this store whose operations also honour `deadline`.
    ///
    /// Each round-trip is bounded by the smaller of the operation timeout and
    /// the deadline's remaining time, and aborts as soon as the deadline is
    /// cancelled.
    pub fn with_deadline(&self, deadline: &Deadline) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            op_timeout: self.op_timeout,
            deadline: Some(deadline.clone()),
        }
    }

    /// Run one backend call under the timeout and the optional deadline.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        let limit = match &self.deadline {
            Some(deadline) => self.op_timeout.min(deadline.remaining()),
            None => self.op_timeout,
        };
        let timed = tokio::time::timeout(limit, call);

        let outcome = match &self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = deadline.cancellation_token().cancelled() => None,
                result = timed => Some(result),
            },
            None => Some(timed.await),
        };

        match outcome {
            Some(Ok(Ok(value))) => Ok(value),
            Some(Ok(Err(e))) => {
                record_cache_operation(operation, "error");
                Err(e)
            }
            Some(Err(_)) => {
                record_cache_operation(operation, "timeout");
                Err(CacheError::BackendUnavailable(format!(
                    "{operation} timed out after {}ms",
                    limit.as_millis()
                )))
            }
            None => {
                record_cache_operation(operation, "cancelled");
                Err(CacheError::BackendUnavailable(format!(
                    "{operation} cancelled by request deadline"
                )))
            }
        }
    }

    /// Raw value for `key`, `None` on miss.
    #[instrument(skip_all)]
    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value = self.bounded("get", self.backend.get(key)).await?;
        record_cache_operation("get", if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    /// Value for `key` decoded as `T`, `None` on miss.
    ///
    /// Values written by [`CacheStore::set`] are JSON and decode exactly. A raw
    /// value that does not decode as `T` (written by another client or by
    /// [`CacheStore::set_raw`]) is retried as a JSON string.
    #[instrument(skip_all)]
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key).await? {
            Some(raw) => decode_value(raw).map(Some),
            None => Ok(None),
        }
    }

    /// Store `value` as JSON under `key` for `ttl`, replacing any previous TTL.
    #[instrument(skip_all)]
    pub async fn set<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let encoded = serde_json::to_string(value)?;
        self.set_raw(key, &encoded, ttl).await
    }

    /// Store `value` verbatim under `key` for `ttl`.
    #[instrument(skip_all)]
    pub async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.bounded("set", self.backend.set(key, value, ttl))
            .await?;
        record_cache_operation("set", "ok");
        Ok(())
    }

    /// Remove `key`. Returns whether it existed.
    #[instrument(skip_all)]
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.bounded("delete", self.backend.delete(key)).await?;
        record_cache_operation("delete", "ok");
        Ok(removed)
    }

    #[instrument(skip_all)]
    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let exists = self.bounded("exists", self.backend.exists(key)).await?;
        record_cache_operation("exists", "ok");
        Ok(exists)
    }

    /// Remaining lifetime of `key`.
    #[instrument(skip_all)]
    pub async fn ttl(&self, key: &str) -> Result<KeyTtl, CacheError> {
        let ttl = self.bounded("ttl", self.backend.ttl(key)).await?;
        record_cache_operation("ttl", "ok");
        Ok(ttl)
    }

    /// Set the expiry of an existing key. Returns false if the key is missing.
    #[instrument(skip_all)]
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let applied = self
            .bounded("expire", self.backend.expire(key, ttl))
            .await?;
        record_cache_operation("expire", "ok");
        Ok(applied)
    }

    /// Increment the counter at `key` and reset its expiry to `ttl`, atomically.
    #[instrument(skip_all)]
    pub async fn increment_counter(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let count = self
            .bounded("increment", self.backend.increment_with_expiry(key, ttl))
            .await?;
        record_cache_operation("increment", "ok");
        Ok(count)
    }

    /// Backend liveness.
    pub async fn ping(&self) -> Result<(), CacheError> {
        self.bounded("ping", self.backend.ping()).await
    }

    /// Cached value for `key`, or the result of `compute` on a miss.
    ///
    /// - On a hit, `compute` is not called.
    /// - On a miss, `compute` is called once and a successful result is cached
    ///   for `ttl`. A failing `compute` propagates and nothing is written.
    /// - Cache failures never fail the call: an unreadable cache counts as a
    ///   miss and a failed write is logged while the value is still returned.
    ///
    /// Concurrent misses on the same key each call `compute`; there is no
    /// in-flight de-duplication.
    #[instrument(skip_all)]
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.get_json::<T>(key).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(CacheError::Serialization(e)) => {
                debug!(
                    target: "admission.cache",
                    key = %key,
                    error = %e,
                    "Cached value undecodable, recomputing"
                );
            }
            Err(e) => {
                warn!(
                    target: "admission.cache",
                    key = %key,
                    error = %e,
                    "Cache read failed, treating as miss"
                );
            }
        }

        let value = compute().await?;

        if let Err(e) = self.set(key, &value, ttl).await {
            warn!(
                target: "admission.cache",
                key = %key,
                error = %e,
                "Failed to cache computed value"
            );
        }

        Ok(value)
    }
}

fn decode_value<T: DeserializeOwned>(raw: String) -> Result<T, CacheError> {
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(json_err) => serde_json::from_value(serde_json::Value::String(raw))
            .map_err(|_| CacheError::Serialization(json_err.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::cache::backend::mock::MockCacheBackend;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        id: u32,
        name: String,
    }

    fn store() -> CacheStore {
        CacheStore::in_memory(DEFAULT_OP_TIMEOUT)
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_compute_caches_until_ttl() {
        let store = store();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let compute = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(Profile {
                id: 1,
                name: "ann".to_string(),
            })
        };

        let first = store
            .get_or_compute("k", Duration::from_secs(1), compute)
            .await
            .unwrap();
        assert_eq!(first.name, "ann");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(500)).await;
        store
            .get_or_compute("k", Duration::from_secs(1), compute)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1, "hit must not recompute");

        tokio::time::advance(Duration::from_millis(600)).await;
        store
            .get_or_compute("k", Duration::from_secs(1), compute)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2, "expired entry recomputes");
    }

    #[tokio::test]
    async fn test_compute_failure_is_not_cached() {
        let store = store();

        let result: Result<Profile, String> = store
            .get_or_compute("k", Duration::from_secs(60), || async {
                Err("db down".to_string())
            })
            .await;
        assert_eq!(result, Err("db down".to_string()));
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_write_still_returns_value() {
        let store = CacheStore::new(
            Arc::new(MockCacheBackend::failing_writes()),
            DEFAULT_OP_TIMEOUT,
        );

        let value = store
            .get_or_compute("k", Duration::from_secs(60), || async {
                Ok::<_, String>(42_i64)
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_unavailable_backend_computes() {
        let backend = Arc::new(MockCacheBackend::unavailable());
        let store = CacheStore::new(backend.clone(), DEFAULT_OP_TIMEOUT);

        let value = store
            .get_or_compute("k", Duration::from_secs(60), || async {
                Ok::<_, String>("fresh".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "fresh");
        // One read, one write
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_value_is_recomputed_and_overwritten() {
        let store = store();
        store
            .set_raw("k", "{not json", Duration::from_secs(60))
            .await
            .unwrap();

        let value = store
            .get_or_compute("k", Duration::from_secs(60), || async {
                Ok::<_, String>(Profile {
                    id: 7,
                    name: "bo".to_string(),
                })
            })
            .await
            .unwrap();
        assert_eq!(value.id, 7);

        let cached: Option<Profile> = store.get_json("k").await.unwrap();
        assert_eq!(cached, Some(value));
    }

    #[tokio::test]
    async fn test_increment_counter_sequence() {
        let store = store();
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(
                store
                    .increment_counter("c", Duration::from_secs(10))
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);

        assert!(matches!(
            store.ttl("c").await.unwrap(),
            KeyTtl::Expires(d) if d <= Duration::from_secs(10)
        ));
    }

    #[tokio::test]
    async fn test_values_stored_as_json() {
        let store = store();
        store
            .set("s", "plain text", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set(
                "p",
                &Profile {
                    id: 3,
                    name: "cy".to_string(),
                },
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert_eq!(store.get("s").await.unwrap().as_deref(), Some(r#""plain text""#));
        assert_eq!(
            store.get("p").await.unwrap().as_deref(),
            Some(r#"{"id":3,"name":"cy"}"#)
        );

        let text: Option<String> = store.get_json("s").await.unwrap();
        assert_eq!(text.as_deref(), Some("plain text"));
    }

    #[tokio::test]
    async fn test_raw_values_read_back_as_strings() {
        let store = store();
        store
            .set_raw("s", "plain text", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.get("s").await.unwrap().as_deref(), Some("plain text"));
        let text: Option<String> = store.get_json("s").await.unwrap();
        assert_eq!(text.as_deref(), Some("plain text"));
    }

    #[tokio::test]
    async fn test_get_or_compute_hit_equals_miss() {
        let store = store();

        let quoted = r#""quoted""#.to_string();
        let computed = quoted.clone();
        let miss: String = store
            .get_or_compute("q", Duration::from_secs(60), || async move {
                Ok::<_, String>(computed)
            })
            .await
            .unwrap();
        let hit: String = store
            .get_or_compute("q", Duration::from_secs(60), || async {
                Ok::<_, String>("recomputed".to_string())
            })
            .await
            .unwrap();
        assert_eq!(miss, quoted);
        assert_eq!(hit, quoted);

        let miss: Option<String> = store
            .get_or_compute("n", Duration::from_secs(60), || async {
                Ok::<_, String>(Some("null".to_string()))
            })
            .await
            .unwrap();
        let hit: Option<String> = store
            .get_or_compute("n", Duration::from_secs(60), || async {
                Ok::<_, String>(None)
            })
            .await
            .unwrap();
        assert_eq!(miss.as_deref(), Some("null"));
        assert_eq!(hit, miss);
    }

    #[tokio::test]
    async fn test_miss_is_not_an_error() {
        let store = store();
        assert_eq!(store.get("absent").await.unwrap(), None);
        assert_eq!(store.ttl("absent").await.unwrap(), KeyTtl::Missing);
        assert!(!store.delete("absent").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_backend_times_out() {
        let store = CacheStore::new(
            Arc::new(MockCacheBackend::stalled()),
            Duration::from_millis(250),
        );

        let result = store.get("k").await;
        assert!(
            matches!(result, Err(CacheError::BackendUnavailable(msg)) if msg.contains("timed out"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_operations() {
        let store = CacheStore::new(Arc::new(MockCacheBackend::stalled()), DEFAULT_OP_TIMEOUT);
        let deadline = Deadline::after(Duration::from_millis(100));
        let scoped = store.with_deadline(&deadline);

        let started = tokio::time::Instant::now();
        let result = scoped.get("k").await;
        assert!(matches!(result, Err(CacheError::BackendUnavailable(_))));
        assert!(started.elapsed() <= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancellation_aborts_operation() {
        let store = CacheStore::new(Arc::new(MockCacheBackend::stalled()), DEFAULT_OP_TIMEOUT);
        let deadline = Deadline::after(Duration::from_secs(30));
        let scoped = store.with_deadline(&deadline);

        let pending = tokio::spawn(async move { scoped.exists("k").await });
        tokio::task::yield_now().await;
        deadline.cancel();

        let result = pending.await.unwrap();
        assert!(
            matches!(result, Err(CacheError::BackendUnavailable(msg)) if msg.contains("cancelled"))
        );
    }

    #[tokio::test]
    async fn test_ping() {
        assert!(store().ping().await.is_ok());
        let down = CacheStore::new(Arc::new(MockCacheBackend::unavailable()), DEFAULT_OP_TIMEOUT);
        assert!(down.ping().await.is_err());
    }
}
