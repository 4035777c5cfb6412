//! Per-request deadline.
//!
//! A `Deadline` is a point in time plus a cancellation token. The pipeline's
//! deadline stage creates one per request and cancels it when the request
//! finishes or times out; anything running on behalf of the request (cache
//! round-trips, database calls) wraps its futures with [`Deadline::run`] so it
//! stops promptly instead of outliving the request.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// The deadline passed or its scope was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Deadline exceeded")]
pub struct DeadlineExceeded;

/// Stand-in for timeouts too large to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Cancellable, time-bounded execution scope. Clones share cancellation.
#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Instant,
    token: CancellationToken,
}

impl Deadline {
    /// Deadline `timeout` from now. Timeouts past the representable range
    /// are clamped to roughly thirty years.
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            expires_at: now
                .checked_add(timeout)
                .unwrap_or_else(|| now + FAR_FUTURE),
            token: CancellationToken::new(),
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || self.remaining().is_zero()
    }

    /// Cancel the scope. Everything waiting in [`Deadline::run`] returns.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Drive `fut` until it completes, the deadline passes, or the scope is cancelled.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(DeadlineExceeded),
            result = tokio::time::timeout_at(self.expires_at, fut) => {
                result.map_err(|_| DeadlineExceeded)
            }
        }
    }
}
