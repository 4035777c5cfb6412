//! Builder for test tokens.
//!
//! Signs claims directly with `jsonwebtoken`, bypassing `TokenService`, so
//! tests can produce tokens the service itself would never issue (expired,
//! not yet valid, signed with the wrong secret).

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

/// Builder for HS256 test tokens.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .with_subject("alice")
///     .with_role("admin")
///     .expires_in(-60)
///     .build(TEST_JWT_SECRET);
/// ```
pub struct TestTokenBuilder {
    sub: String,
    username: String,
    email: String,
    role: String,
    iss: String,
    iat: i64,
    nbf: i64,
    exp: i64,
}

impl TestTokenBuilder {
    /// Valid for one hour from now.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-user".to_string(),
            username: "test".to_string(),
            email: "test@example.com".to_string(),
            role: "member".to_string(),
            iss: "admission".to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::seconds(3600)).timestamp(),
        }
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = username.to_string();
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    pub fn with_iat(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    pub fn with_nbf(mut self, timestamp: i64) -> Self {
        self.nbf = timestamp;
        self
    }

    pub fn with_exp(mut self, timestamp: i64) -> Self {
        self.exp = timestamp;
        self
    }

    /// Set expiration in seconds from now. Negative values produce an expired token.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// The claims as a JSON value.
    pub fn claims(&self) -> Value {
        json!({
            "user_id": self.sub,
            "username": self.username,
            "email": self.email,
            "role": self.role,
            "iat": self.iat,
            "nbf": self.nbf,
            "exp": self.exp,
            "iss": self.iss,
            "sub": self.sub,
            "jti": uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Sign the claims with `secret`.
    pub fn build(self, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &self.claims(),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("HS256 encoding of JSON claims cannot fail")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
