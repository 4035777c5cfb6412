//! Redis cache backend.
//!
//! # Connection Pattern
//!
//! The redis-rs `MultiplexedConnection` is cheap to clone and safe to use
//! concurrently, so each operation clones it instead of locking.
//!
//! # Security
//!
//! The Redis URL may carry credentials (`redis://:password@host:port`) and is
//! never logged.

use crate::cache::backend::{CacheBackend, KeyTtl};
use crate::cache::lua_scripts;
use crate::errors::CacheError;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Script};
use std::time::Duration;
use tracing::error;

/// [`CacheBackend`] over a single Redis instance.
#[derive(Clone)]
pub struct RedisCacheBackend {
    connection: MultiplexedConnection,
    increment_script: Script,
}

impl RedisCacheBackend {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::BackendUnavailable` if the URL is invalid or the
    /// connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url).map_err(|e| {
            error!(target: "admission.cache.redis", error = %e, "Failed to open Redis client");
            CacheError::BackendUnavailable(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "admission.cache.redis", error = %e, "Failed to connect to Redis");
                CacheError::BackendUnavailable(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self {
            connection,
            increment_script: Script::new(lua_scripts::INCREMENT_WITH_EXPIRY),
        })
    }
}

/// TTL in whole milliseconds, at least 1 (Redis rejects a zero expiry).
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Interpret a `PTTL` reply.
fn key_ttl_from_pttl(pttl: i64) -> KeyTtl {
    match pttl {
        -2 => KeyTtl::Missing,
        -1 => KeyTtl::Persistent,
        ms => KeyTtl::Expires(Duration::from_millis(u64::try_from(ms).unwrap_or(0))),
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, CacheError> {
        let mut conn = self.connection.clone();
        let pttl: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok(key_ttl_from_pttl(pttl))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut conn = self.connection.clone();
        let applied: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(applied == 1)
    }

    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let mut conn = self.connection.clone();
        let count: i64 = self
            .increment_script
            .key(key)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
