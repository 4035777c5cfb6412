//! Token claim set and the identity derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attributes carried alongside the subject in every token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAttributes {
    pub username: String,
    pub email: String,
    pub role: String,
}

/// Email is personal data; keep it out of logs.
impl fmt::Debug for UserAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAttributes")
            .field("username", &self.username)
            .field("email", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// Signed claim set.
///
/// Timestamps are absolute Unix seconds. `user_id` and `sub` always hold the
/// same subject identifier; `sub` is the registered claim, `user_id` is kept
/// for consumers that read the application claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    #[serde(flatten)]
    pub attributes: UserAttributes,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
    pub sub: String,
    /// Unique token id. Two tokens issued in the same second differ here.
    pub jti: String,
}

impl Claims {
    /// Identity to attach to a request once these claims are validated.
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub.clone(),
            username: self.attributes.username.clone(),
            email: self.attributes.email.clone(),
            role: self.attributes.role.clone(),
        }
    }
}

/// Authenticated caller, as seen by downstream handlers.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("email", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}
