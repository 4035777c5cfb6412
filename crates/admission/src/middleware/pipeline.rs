//! Pipeline assembly.
//!
//! Stage order, outermost first:
//!
//! 1. fault boundary
//! 2. security headers / CORS (answers `OPTIONS` pre-flight)
//! 3. request identification
//! 4. request body size limit
//! 5. deadline
//! 6. rate limiting and 7. authentication, in the order chosen by [`StageOrder`]
//! 8. the router's handlers

use crate::auth::TokenService;
use crate::middleware::{
    auth::require_auth, body_limit::max_body_bytes, deadline::enforce_deadline,
    fault_boundary::fault_boundary, rate_limit::rate_limit, request_id::request_id,
    security_headers::security_headers,
};
use crate::rate_limit::RateLimiter;
use axum::{
    http::{header::InvalidHeaderValue, HeaderValue},
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;

/// Pipeline settings taken from [`Config`](crate::config::Config).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub request_timeout: Duration,
    /// Largest request body accepted, in bytes.
    pub max_body_bytes: u64,
    pub cors_allow_origin: String,
}

/// Relative order of the rate-limit and authentication stages.
///
/// Under a flood of requests with bad credentials, `RateLimitThenAuth` answers
/// 429 once the bucket is empty without validating any more tokens, while
/// `AuthThenRateLimit` answers 401 to every one of them and never consumes
/// capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StageOrder {
    #[default]
    RateLimitThenAuth,
    AuthThenRateLimit,
}

/// Shared state for the stages that need it.
pub struct PipelineState {
    pub(crate) token_service: Arc<TokenService>,
    pub(crate) rate_limiter: Arc<dyn RateLimiter>,
    pub(crate) request_timeout: Duration,
    pub(crate) max_body_bytes: u64,
    pub(crate) cors_allow_origin: HeaderValue,
}

/// The request admission pipeline.
#[derive(Clone)]
pub struct Pipeline {
    state: Arc<PipelineState>,
    order: StageOrder,
}

impl Pipeline {
    /// Build a pipeline in the canonical stage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured CORS origin is not a valid header value.
    pub fn new(
        token_service: Arc<TokenService>,
        rate_limiter: Arc<dyn RateLimiter>,
        config: &PipelineConfig,
    ) -> Result<Self, InvalidHeaderValue> {
        let cors_allow_origin = HeaderValue::from_str(&config.cors_allow_origin)?;
        Ok(Self {
            state: Arc::new(PipelineState {
                token_service,
                rate_limiter,
                request_timeout: config.request_timeout,
                max_body_bytes: config.max_body_bytes,
                cors_allow_origin,
            }),
            order: StageOrder::default(),
        })
    }

    pub fn with_stage_order(mut self, order: StageOrder) -> Self {
        self.order = order;
        self
    }

    pub fn stage_order(&self) -> StageOrder {
        self.order
    }

    /// Wrap every route of `router` in the pipeline.
    ///
    /// Routes added to the router after this call are not covered.
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let state = Arc::clone(&self.state);

        // Router::layer wraps what is already there, so the stage added last runs first.
        let router = match self.order {
            StageOrder::RateLimitThenAuth => router
                .layer(from_fn_with_state(Arc::clone(&state), require_auth))
                .layer(from_fn_with_state(Arc::clone(&state), rate_limit)),
            StageOrder::AuthThenRateLimit => router
                .layer(from_fn_with_state(Arc::clone(&state), rate_limit))
                .layer(from_fn_with_state(Arc::clone(&state), require_auth)),
        };

        router.layer(
            ServiceBuilder::new()
                .layer(from_fn(fault_boundary))
                .layer(from_fn_with_state(Arc::clone(&state), security_headers))
                .layer(from_fn(request_id))
                .layer(from_fn_with_state(Arc::clone(&state), max_body_bytes))
                .layer(from_fn_with_state(state, enforce_deadline)),
        )
    }
}
