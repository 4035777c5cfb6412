//! Token lifecycle: issue, validate, refresh.
//!
//! `TokenService` holds only its static configuration (signing key, issuer,
//! clock skew) and is safe for unbounded concurrent use. Every operation has
//! an `_at` variant that takes the current Unix time explicitly.

use crate::auth::claims::{Claims, UserAttributes};
use crate::auth::codec::ClaimsCodec;
use crate::errors::{AuthError, TokenError};
use crate::observability::metrics::{record_token_issued, record_token_validation};
use chrono::Utc;
use common::jwt::check_time_window;
use secrecy::SecretString;
use std::time::Duration;
use tracing::instrument;

/// Token service configuration.
#[derive(Clone, Debug)]
pub struct TokenConfig {
    pub secret: SecretString,
    pub issuer: String,
    /// Lifetime used by callers that have no specific TTL in mind.
    pub default_ttl: chrono::Duration,
    /// Tolerance applied to not-before and issued-at.
    pub clock_skew: Duration,
}

#[derive(Debug, Clone)]
pub struct TokenService {
    codec: ClaimsCodec,
    issuer: String,
    default_ttl: chrono::Duration,
    clock_skew: Duration,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        Self {
            codec: ClaimsCodec::new(&config.secret),
            issuer: config.issuer,
            default_ttl: config.default_ttl,
            clock_skew: config.clock_skew,
        }
    }

    pub fn default_ttl(&self) -> chrono::Duration {
        self.default_ttl
    }

    /// Issue a token for `subject` valid from now for `ttl`.
    ///
    /// A negative `ttl` yields a token that is already expired.
    #[instrument(skip_all)]
    pub fn issue(
        &self,
        subject: &str,
        attributes: &UserAttributes,
        ttl: chrono::Duration,
    ) -> Result<String, TokenError> {
        self.issue_at(subject, attributes, ttl, Utc::now().timestamp())
    }

    pub fn issue_at(
        &self,
        subject: &str,
        attributes: &UserAttributes,
        ttl: chrono::Duration,
        now: i64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id: subject.to_string(),
            attributes: attributes.clone(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(ttl.num_seconds()),
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = self.codec.encode(&claims)?;
        record_token_issued();

        tracing::debug!(
            target: "admission.auth.token_service",
            exp = claims.exp,
            "Token issued"
        );

        Ok(token)
    }

    /// Validate a token: decode, verify signature, then check time bounds.
    #[instrument(skip_all)]
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    pub fn validate_at(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        let result = self.codec.decode(token).and_then(|claims| {
            check_time_window(claims.iat, claims.nbf, claims.exp, self.clock_skew, now)?;
            Ok(claims)
        });

        match &result {
            Ok(_) => record_token_validation("success"),
            Err(e) => {
                tracing::debug!(
                    target: "admission.auth.token_service",
                    reason = e.as_str(),
                    "Token validation failed"
                );
                record_token_validation(e.as_str());
            }
        }

        result
    }

    /// Issue a new token carrying the same subject and attributes.
    ///
    /// The old token is not revoked; it stays valid until its own expiry.
    #[instrument(skip_all)]
    pub fn refresh(&self, token: &str, new_ttl: chrono::Duration) -> Result<String, TokenError> {
        self.refresh_at(token, new_ttl, Utc::now().timestamp())
    }

    pub fn refresh_at(
        &self,
        token: &str,
        new_ttl: chrono::Duration,
        now: i64,
    ) -> Result<String, TokenError> {
        let claims = self.validate_at(token, now)?;
        self.issue_at(&claims.sub, &claims.attributes, new_ttl, now)
    }

    /// Time left until the token expires.
    pub fn remaining(&self, token: &str) -> Result<Duration, AuthError> {
        self.remaining_at(token, Utc::now().timestamp())
    }

    pub fn remaining_at(&self, token: &str, now: i64) -> Result<Duration, AuthError> {
        let claims = self.validate_at(token, now)?;
        let secs = u64::try_from(claims.exp.saturating_sub(now)).map_err(|_| AuthError::Expired)?;
        Ok(Duration::from_secs(secs))
    }

    /// Whether the token should be treated as expired.
    ///
    /// Any validation failure counts as expired.
    pub fn is_expired(&self, token: &str) -> bool {
        self.is_expired_at(token, Utc::now().timestamp())
    }

    pub fn is_expired_at(&self, token: &str, now: i64) -> bool {
        match self.validate_at(token, now) {
            Ok(claims) => claims.exp <= now,
            Err(_) => true,
        }
    }

    /// Subject identifier of a valid token.
    pub fn subject(&self, token: &str) -> Result<String, AuthError> {
        self.validate(token).map(|claims| claims.sub)
    }
}
