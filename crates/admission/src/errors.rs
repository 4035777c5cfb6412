//! Admission error types.
//!
//! `AuthError`, `CacheError` and `MutationError` are returned synchronously to
//! the immediate caller. `AdmissionError` is what a pipeline stage aborts with;
//! it maps to an HTTP response via `IntoResponse`.
//!
//! Messages returned to clients are intentionally generic. The underlying cause
//! is logged server-side and never serialized into a response body.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::{TimeWindowError, TokenFormatError};
use serde::Serialize;
use thiserror::Error;

/// Token validation and credential extraction failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Wrong segment count, oversized, undecodable, or wrong algorithm.
    #[error("Malformed token")]
    Malformed,

    /// MAC does not match the header and payload.
    #[error("Bad token signature")]
    BadSignature,

    /// Current time is past the token's expiry.
    #[error("Token expired")]
    Expired,

    /// Token's not-before (or issued-at) lies beyond the clock skew tolerance.
    #[error("Token not yet valid")]
    NotYetValid,

    /// No `Authorization: Bearer <token>` header on the request.
    #[error("Missing bearer credential")]
    MissingCredential,
}

impl AuthError {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthError::Malformed => "malformed",
            AuthError::BadSignature => "bad_signature",
            AuthError::Expired => "expired",
            AuthError::NotYetValid => "not_yet_valid",
            AuthError::MissingCredential => "missing_credential",
        }
    }
}

impl From<TokenFormatError> for AuthError {
    fn from(_: TokenFormatError) -> Self {
        AuthError::Malformed
    }
}

impl From<TimeWindowError> for AuthError {
    fn from(err: TimeWindowError) -> Self {
        match err {
            TimeWindowError::Expired => AuthError::Expired,
            TimeWindowError::NotYetValid => AuthError::NotYetValid,
        }
    }
}

/// Token issuance and refresh failures.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Refresh input failed validation; the reason is unchanged.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Claims could not be serialized or signed.
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Cache accessor failures.
///
/// A miss is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backing store timed out or the transport failed.
    #[error("Cache backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Value could not be encoded to or decoded from its textual form.
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::BackendUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Partial-update statement building and execution failures.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Nothing left to update after allow-list filtering.
    #[error("No fields to update")]
    NoFieldsToUpdate,

    /// A declared column name is not a plain SQL identifier, or is the id column.
    #[error("Invalid column in allow-list: {0}")]
    InvalidColumn(String),

    /// The update statement matched no row.
    #[error("Record not found")]
    NotFound,

    /// The request deadline passed before the statement completed.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for MutationError {
    fn from(err: sqlx::Error) -> Self {
        MutationError::Database(err.to_string())
    }
}

/// Pipeline abort reasons.
///
/// Maps to HTTP status codes:
/// - Unauthorized: 401 Unauthorized (with `WWW-Authenticate`)
/// - RateLimitExceeded: 429 Too Many Requests
/// - DeadlineExceeded: 408 Request Timeout
/// - PayloadTooLarge: 413 Payload Too Large
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Unauthorized: {0}")]
    Unauthorized(AuthError),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Internal server error")]
    Internal,
}

impl AdmissionError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdmissionError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AdmissionError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AdmissionError::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
            AdmissionError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AdmissionError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for AdmissionError {
    fn from(err: AuthError) -> Self {
        AdmissionError::Unauthorized(err)
    }
}

/// Error body shared by every aborting stage.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: &'static str,
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AdmissionError::Unauthorized(AuthError::MissingCredential) => ErrorResponse {
                error: "UNAUTHORIZED",
                message: "Authorization header must be in format: Bearer <token>",
            },
            AdmissionError::Unauthorized(reason) => {
                // Actual reason stays server-side
                tracing::debug!(target: "admission.errors", reason = reason.as_str(), "Rejecting credential");
                ErrorResponse {
                    error: "UNAUTHORIZED",
                    message: "The access token is invalid or expired",
                }
            }
            AdmissionError::RateLimitExceeded => ErrorResponse {
                error: "RATE_LIMIT_EXCEEDED",
                message: "Too many requests. Please try again later.",
            },
            AdmissionError::DeadlineExceeded => ErrorResponse {
                error: "REQUEST_TIMEOUT",
                message: "The request took too long to process",
            },
            AdmissionError::PayloadTooLarge => ErrorResponse {
                error: "PAYLOAD_TOO_LARGE",
                message: "Request body exceeds the allowed size",
            },
            AdmissionError::Internal => ErrorResponse {
                error: "INTERNAL_ERROR",
                message: "An internal error occurred",
            },
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"api\", error=\"invalid_token\""),
            );
        }

        response
    }
}
