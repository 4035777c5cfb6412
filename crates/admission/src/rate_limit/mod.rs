//! Admission control.
//!
//! The pipeline only sees the [`RateLimiter`] capability. `TokenBucket` is the
//! per-process implementation; `WindowCounterLimiter` shares its count
//! through the cache so several instances enforce one limit.

pub mod token_bucket;
pub mod window_counter;

pub use token_bucket::{TokenBucket, TokenBucketConfig};
pub use window_counter::WindowCounterLimiter;

/// Decides whether one more request may proceed.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    /// Consume one unit of capacity. Returns false when none is available.
    async fn allow(&self) -> bool;
}
