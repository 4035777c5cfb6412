//! Request deadline stage.
//!
//! Gives every request a [`Deadline`] and aborts with 408 once it passes. The
//! deadline is cancelled when the request finishes either way, so work that
//! was spawned with it (cache or database calls) stops as well.

use crate::deadline::Deadline;
use crate::errors::AdmissionError;
use crate::middleware::context::set_deadline;
use crate::middleware::PipelineState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

pub async fn enforce_deadline(
    State(state): State<Arc<PipelineState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AdmissionError> {
    let deadline = Deadline::after(state.request_timeout);
    set_deadline(&mut req, deadline.clone());

    let result = deadline.run(next.run(req)).await;
    deadline.cancel();

    result.map_err(|_| {
        warn!(
            target: "admission.middleware.deadline",
            timeout_ms = u64::try_from(state.request_timeout.as_millis()).unwrap_or(u64::MAX),
            "Request deadline exceeded"
        );
        AdmissionError::DeadlineExceeded
    })
}
