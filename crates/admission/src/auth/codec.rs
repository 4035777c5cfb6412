//! Claims codec: claim set to signed token string and back.
//!
//! Signing is HMAC-SHA256 over `header "." payload` with a shared secret.
//! Decoding runs in a fixed order:
//! 1. Structural checks (size, segment count, header, algorithm pin, segment decoding)
//! 2. Signature verification (constant-time comparison)
//! 3. Payload decoding
//!
//! Time bounds are NOT checked here; the caller does that after `decode`
//! returns, so a token is never time-checked before its signature is verified.

use crate::auth::claims::Claims;
use crate::errors::{AuthError, TokenError};
use common::jwt::{check_body_segments, inspect_header, TOKEN_TYPE};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Encodes and decodes signed claim sets with one shared secret.
#[derive(Clone)]
pub struct ClaimsCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

/// Key material stays out of Debug output.
impl fmt::Debug for ClaimsCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl ClaimsCodec {
    pub fn new(secret: &SecretString) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        // Time windows are checked after decode with our own skew rules
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation,
        }
    }

    /// Serialize and sign a claim set.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some(TOKEN_TYPE.to_string());

        encode(&header, claims, &self.encoding_key).map_err(|e| {
            tracing::error!(target: "admission.auth.codec", error = %e, "Token signing failed");
            TokenError::Encoding(e.to_string())
        })
    }

    /// Verify a token's signature and decode its claims.
    ///
    /// Returns claims whose signature is valid but whose time window has not
    /// been checked.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        inspect_header(token)?;
        check_body_segments(token)?;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::InvalidSignature => AuthError::BadSignature,
                    _ => AuthError::Malformed,
                };
                tracing::debug!(
                    target: "admission.auth.codec",
                    error = %e,
                    reason = reason.as_str(),
                    "Token decoding failed"
                );
                reason
            })?;

        Ok(token_data.claims)
    }
}
