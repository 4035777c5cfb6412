//! Fixed-window limiter shared through the cache.
//!
//! Every instance increments the same counter, `{prefix}:{window_index}`,
//! so the limit holds across processes. Each window's counter expires with
//! the window.

use crate::cache::CacheStore;
use crate::observability::metrics::record_rate_limit_decision;
use crate::rate_limit::RateLimiter;
use chrono::Utc;
use std::time::Duration;
use tracing::warn;

/// At most `limit` admissions per fixed `window`, counted in the cache.
///
/// Fails open: if the cache cannot be reached the request is admitted and a
/// warning is logged.
#[derive(Clone)]
pub struct WindowCounterLimiter {
    store: CacheStore,
    key_prefix: String,
    limit: u64,
    window: Duration,
}

impl WindowCounterLimiter {
    pub fn new(
        store: CacheStore,
        key_prefix: impl Into<String>,
        limit: u64,
        window: Duration,
    ) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            limit,
            // Sub-second windows would all share index 0
            window: window.max(Duration::from_secs(1)),
        }
    }

    fn key_for(&self, now_unix: i64) -> String {
        // Safe cast: window is at least one second and far below i64::MAX
        #[allow(clippy::cast_possible_wrap)]
        let window_secs = self.window.as_secs() as i64;
        format!("{}:{}", self.key_prefix, now_unix.div_euclid(window_secs))
    }

    /// Admission decision at an explicit Unix time.
    pub async fn allow_at(&self, now_unix: i64) -> bool {
        let key = self.key_for(now_unix);

        let allowed = match self.store.increment_counter(&key, self.window).await {
            Ok(count) => u64::try_from(count).map_or(true, |count| count <= self.limit),
            Err(e) => {
                warn!(
                    target: "admission.rate_limit",
                    error = %e,
                    "Shared rate limit counter unavailable, admitting request"
                );
                true
            }
        };

        record_rate_limit_decision(allowed);
        allowed
    }
}

#[async_trait::async_trait]
impl RateLimiter for WindowCounterLimiter {
    async fn allow(&self) -> bool {
        self.allow_at(Utc::now().timestamp()).await
    }
}
