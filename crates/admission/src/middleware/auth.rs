//! Authentication stage.
//!
//! Requires `Authorization: Bearer <token>`, validates the token, and attaches
//! the caller's identity to the request context. The decoded [`Claims`] are
//! also inserted as an extension for handlers that need the raw claims.

use crate::auth::Claims;
use crate::errors::{AdmissionError, AuthError};
use crate::middleware::context::set_identity;
use crate::middleware::PipelineState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, instrument};

#[instrument(skip_all, name = "admission.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<PipelineState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AdmissionError> {
    let token = bearer_token(req.headers())?;

    let claims: Claims = state.token_service.validate(token).map_err(|e| {
        debug!(target: "admission.middleware.auth", reason = e.as_str(), "Token validation failed");
        AdmissionError::Unauthorized(e)
    })?;

    set_identity(&mut req, claims.identity());
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingCredential)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_missing_or_wrong_scheme() {
        assert_eq!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredential)
        );
        assert_eq!(
            bearer_token(&headers_with("Basic dXNlcjpwYXNz")),
            Err(AuthError::MissingCredential)
        );
        assert_eq!(
            bearer_token(&headers_with("bearer abc")),
            Err(AuthError::MissingCredential)
        );
        assert_eq!(
            bearer_token(&headers_with("Bearer ")),
            Err(AuthError::MissingCredential)
        );
    }
}
