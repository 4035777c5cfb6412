//! Process-local cache backend.
//!
//! Same semantics as the Redis backend, including lazy expiry and atomic
//! counters. Suitable for tests and single-instance development.

use crate::cache::backend::{CacheBackend, KeyTtl};
use crate::errors::CacheError;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-memory [`CacheBackend`]. Expired entries are dropped when touched.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Drop `key` if it has expired, then return the live entry, if any.
fn live_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().await;
        Ok(live_entry(&mut entries, key, Instant::now()).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().await;
        let existed = live_entry(&mut entries, key, Instant::now()).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().await;
        Ok(live_entry(&mut entries, key, Instant::now()).is_some())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, CacheError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        Ok(match live_entry(&mut entries, key, now) {
            None => KeyTtl::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => KeyTtl::Expires(at.saturating_duration_since(now)),
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match live_entry(&mut entries, key, now) {
            Some(entry) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let current = match live_entry(&mut entries, key, now) {
            Some(entry) => entry.value.parse::<i64>().map_err(|_| {
                CacheError::Serialization("value is not an integer".to_string())
            })?,
            None => 0,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| CacheError::Serialization("increment would overflow".to_string()))?;

        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(next)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
