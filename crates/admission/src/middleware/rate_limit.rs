//! Rate-limit stage.

use crate::errors::AdmissionError;
use crate::middleware::PipelineState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

pub async fn rate_limit(
    State(state): State<Arc<PipelineState>>,
    req: Request,
    next: Next,
) -> Result<Response, AdmissionError> {
    if !state.rate_limiter.allow().await {
        debug!(target: "admission.middleware.rate_limit", "Request rejected by rate limiter");
        return Err(AdmissionError::RateLimitExceeded);
    }
    Ok(next.run(req).await)
}
