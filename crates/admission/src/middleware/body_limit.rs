//! Request body size stage.
//!
//! A declared `Content-Length` over the limit is refused with 413 before the
//! handler runs. Bodies without a length (chunked) are wrapped in
//! [`Limited`], so reading past the limit fails and axum's body extractors
//! answer 413 themselves.

use crate::errors::AdmissionError;
use crate::middleware::PipelineState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use http_body_util::Limited;
use std::sync::Arc;
use tracing::warn;

pub async fn max_body_bytes(
    State(state): State<Arc<PipelineState>>,
    req: Request,
    next: Next,
) -> Result<Response, AdmissionError> {
    let limit = state.max_body_bytes;

    if let Some(declared) = declared_length(req.headers()) {
        if declared > limit {
            warn!(
                target: "admission.middleware.body_limit",
                declared,
                limit,
                "Request body too large"
            );
            return Err(AdmissionError::PayloadTooLarge);
        }
    }

    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let req = req.map(|body| Body::new(Limited::new(body, limit)));
    Ok(next.run(req).await)
}

/// `Content-Length` as a number. Unparseable values count as absent; hyper
/// has already rejected those on a real connection.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
