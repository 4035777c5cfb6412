//! In-process token bucket.
//!
//! Refill is computed lazily from elapsed time on every admission check;
//! there is no background timer. The check-and-consume runs under one mutex
//! so concurrent callers can never spend the same token twice.

use crate::rate_limit::RateLimiter;
use std::sync::{Mutex, PoisonError};
use tokio::time::Instant;

/// Token bucket parameters.
#[derive(Debug, Clone, Copy)]
pub struct TokenBucketConfig {
    /// Maximum burst size.
    pub capacity: u32,
    /// Sustained rate in tokens per second.
    pub refill_per_second: f64,
}

#[derive(Debug)]
struct BucketState {
    /// Always within `[0, capacity]`.
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket shared by every request that reaches one limiter instance.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// New bucket, starting full.
    pub fn new(config: TokenBucketConfig) -> Self {
        let capacity = f64::from(config.capacity);
        Self {
            capacity,
            refill_per_second: config.refill_per_second.max(0.0),
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Refill from elapsed time, then take one token if available.
    pub fn try_acquire(&self) -> bool {
        // A panic while holding the lock cannot leave the state inconsistent
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill);
        state.tokens =
            (state.tokens + elapsed.as_secs_f64() * self.refill_per_second).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, without refilling.
    pub fn available(&self) -> f64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
    }
}

#[async_trait::async_trait]
impl RateLimiter for TokenBucket {
    async fn allow(&self) -> bool {
        let allowed = self.try_acquire();
        crate::observability::metrics::record_rate_limit_decision(allowed);
        if !allowed {
            tracing::debug!(target: "admission.rate_limit", "Token bucket empty");
        }
        allowed
    }
}
