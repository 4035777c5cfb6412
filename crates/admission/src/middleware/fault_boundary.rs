//! Outermost stage: contains panics from every inner stage and the handler.
//!
//! A panic becomes one generic 500 response and one error log line. It never
//! propagates past the pipeline.

use crate::errors::AdmissionError;
use crate::observability::metrics::record_pipeline_fault;
use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::error;

pub async fn fault_boundary(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            error!(
                target: "admission.middleware.fault_boundary",
                method = %method,
                path = %path,
                panic = panic_message(payload.as_ref()),
                "Unhandled fault in request pipeline"
            );
            record_pipeline_fault();
            AdmissionError::Internal.into_response()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
