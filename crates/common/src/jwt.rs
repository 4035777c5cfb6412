//! Token wire-format utilities shared across admission components.
//!
//! A token is three URL-safe base64 segments joined by `.`:
//!
//! ```text
//! base64url(header) . base64url(claims) . base64url(HMAC-SHA256(secret, header "." claims))
//! ```
//!
//! This module holds the checks that run before any cryptographic work and the
//! time-window checks that run after it:
//! - Size limit (DoS prevention)
//! - Segment count
//! - Header decoding and algorithm pinning
//! - Payload and signature decodability
//! - Expiry / not-before / issued-at windows with clock skew tolerance
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Only HS256 is accepted; the header cannot downgrade the algorithm
//! - Error messages are generic; details go to debug logs only
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{inspect_header, check_time_window, DEFAULT_CLOCK_SKEW};
//!
//! // Structural checks first
//! inspect_header(token)?;
//!
//! // ... verify signature, decode claims ...
//!
//! // Time checks last
//! check_time_window(claims.iat, claims.nbf, claims.exp, DEFAULT_CLOCK_SKEW, now)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed token size in bytes (8KB).
///
/// Typical tokens issued by this system are 300-500 bytes. Anything larger is
/// rejected before base64 decoding or MAC computation.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// The only signing algorithm accepted in token headers.
pub const TOKEN_ALGORITHM: &str = "HS256";

/// Token type written into headers.
pub const TOKEN_TYPE: &str = "JWT";

/// Default clock skew tolerance (5 minutes).
///
/// Applied to `nbf` and `iat`: a token issued by a host whose clock runs ahead
/// of ours by less than this amount is still accepted.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum clock skew tolerance a deployment may configure (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Structural problems detected before signature verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenFormatError {
    /// Token size exceeds [`MAX_TOKEN_SIZE_BYTES`].
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token does not have exactly three non-empty segments.
    #[error("The access token is invalid or expired")]
    WrongSegmentCount,

    /// Header segment is not base64url-encoded JSON.
    #[error("The access token is invalid or expired")]
    UndecodableHeader,

    /// Header names an algorithm other than [`TOKEN_ALGORITHM`].
    #[error("The access token is invalid or expired")]
    UnsupportedAlgorithm,

    /// Payload is not base64url-encoded JSON, or signature is not base64url.
    #[error("The access token is invalid or expired")]
    UndecodableSegment,
}

/// Time-window violations detected after signature verification.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindowError {
    /// `now` is past `exp`.
    #[error("The access token is invalid or expired")]
    Expired,

    /// `nbf` (or `iat`) is further in the future than the skew tolerance allows.
    #[error("The access token is invalid or expired")]
    NotYetValid,
}

// =============================================================================
// Header
// =============================================================================

/// Decoded token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signing algorithm.
    pub alg: String,

    /// Token type, normally `JWT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

// =============================================================================
// Functions
// =============================================================================

/// Run the structural checks on a token and return its decoded header.
///
/// This does NOT verify the signature. It only guarantees that the token is
/// small enough, has three non-empty segments, and names the pinned algorithm.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_TOKEN_SIZE_BYTES`]
/// - `WrongSegmentCount` - not exactly three non-empty `.`-separated segments
/// - `UndecodableHeader` - header is not base64url JSON
/// - `UnsupportedAlgorithm` - header `alg` is not [`TOKEN_ALGORITHM`]
pub fn inspect_header(token: &str) -> Result<TokenHeader, TokenFormatError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(TokenFormatError::TokenTooLarge);
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid segment structure"
        );
        return Err(TokenFormatError::WrongSegmentCount);
    }

    let header_part = parts.first().ok_or(TokenFormatError::WrongSegmentCount)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode token header base64");
        TokenFormatError::UndecodableHeader
    })?;

    let header: TokenHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse token header JSON");
        TokenFormatError::UndecodableHeader
    })?;

    if header.alg != TOKEN_ALGORITHM {
        tracing::debug!(
            target: "common.jwt",
            alg = %header.alg,
            "Token rejected: unsupported algorithm"
        );
        return Err(TokenFormatError::UnsupportedAlgorithm);
    }

    Ok(header)
}

/// Check that the payload and signature segments decode.
///
/// The payload must be a base64url JSON object and the signature base64url
/// bytes. Run after [`inspect_header`], before the signature is verified, so
/// garbage segments are reported as malformed rather than as a bad signature.
///
/// # Errors
///
/// - `WrongSegmentCount` - not exactly three `.`-separated segments
/// - `UndecodableSegment` - payload or signature fails to decode
pub fn check_body_segments(token: &str) -> Result<(), TokenFormatError> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenFormatError::WrongSegmentCount);
    };

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode token payload base64");
        TokenFormatError::UndecodableSegment
    })?;

    let payload_json: serde_json::Value = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse token payload JSON");
        TokenFormatError::UndecodableSegment
    })?;
    if !payload_json.is_object() {
        tracing::debug!(target: "common.jwt", "Token payload is not a JSON object");
        return Err(TokenFormatError::UndecodableSegment);
    }

    let signature_bytes = URL_SAFE_NO_PAD.decode(signature).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode token signature base64");
        TokenFormatError::UndecodableSegment
    })?;
    if signature_bytes.is_empty() {
        return Err(TokenFormatError::UndecodableSegment);
    }

    Ok(())
}

/// Check `exp`, `nbf` and `iat` (Unix epoch seconds) against `now`.
///
/// - Expired when `now > exp` (no tolerance: a token is never honoured past its expiry)
/// - Not yet valid when `nbf - clock_skew > now` or `iat - clock_skew > now`
///
/// Must only be called on claims whose signature has already been verified.
///
/// # Errors
///
/// Returns the first violated bound, expiry first.
pub fn check_time_window(
    iat: i64,
    nbf: i64,
    exp: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), TimeWindowError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;

    if now > exp {
        tracing::debug!(target: "common.jwt", exp = exp, now = now, "Token rejected: expired");
        return Err(TimeWindowError::Expired);
    }

    let earliest_valid = nbf.max(iat).saturating_sub(clock_skew_secs);
    if now < earliest_valid {
        tracing::debug!(
            target: "common.jwt",
            nbf = nbf,
            iat = iat,
            now = now,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: not yet valid"
        );
        return Err(TimeWindowError::NotYetValid);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
