//! Security headers and CORS.
//!
//! Pure response augmentation. The only short-circuit is a CORS pre-flight
//! (`OPTIONS`), answered with 204 before any later stage runs.

use crate::middleware::PipelineState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Origin, Content-Type, Accept, Authorization, X-Request-ID";
const EXPOSED_HEADERS: &str = "X-Request-ID";

fn static_headers() -> [(HeaderName, &'static str); 8] {
    [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_XSS_PROTECTION, "1; mode=block"),
        (
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=31536000; includeSubDomains",
        ),
        (header::CONTENT_SECURITY_POLICY, "default-src 'self'"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS),
        (header::ACCESS_CONTROL_EXPOSE_HEADERS, EXPOSED_HEADERS),
    ]
}

pub async fn security_headers(
    State(state): State<Arc<PipelineState>>,
    req: Request,
    next: Next,
) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    apply_headers(response.headers_mut(), &state.cors_allow_origin);
    response
}

/// Credentials are only allowed for an explicit origin; browsers reject the
/// combination with `*`.
fn apply_headers(headers: &mut HeaderMap, allow_origin: &HeaderValue) {
    for (name, value) in static_headers() {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin.clone());
    if allow_origin.as_bytes() == b"*" {
        headers.remove(header::ACCESS_CONTROL_ALLOW_CREDENTIALS);
    } else {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
}
