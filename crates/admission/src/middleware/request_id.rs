//! Request identification.
//!
//! Reuses a well-formed `X-Request-ID` from the client, otherwise generates a
//! UUID v4. The id is attached to the request context, to a tracing span that
//! covers every later stage, and to the response.

use crate::middleware::context::RequestContext;
use crate::observability::metrics::record_http_request;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, info_span, Instrument};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

pub async fn request_id(mut req: Request, next: Next) -> Response {
    let start = Instant::now();
    let id = incoming_request_id(req.headers())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    req.extensions_mut().insert(RequestContext::new(id.clone()));

    let span = info_span!("request", request_id = %id, method = %method, path = %path);
    let mut response = next.run(req).instrument(span.clone()).await;

    let status = response.status().as_u16();
    let duration = start.elapsed();
    span.in_scope(|| {
        info!(
            target: "admission.middleware.request",
            status,
            latency_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "Request completed"
        );
    });
    record_http_request(method.as_str(), status, duration);

    if let Ok(value) = HeaderValue::from_str(&id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Client-supplied id, if it is 1..=128 visible ASCII characters.
fn incoming_request_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let valid = !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic());
    valid.then(|| value.to_owned())
}
