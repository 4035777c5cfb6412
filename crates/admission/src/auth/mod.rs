//! Signed-claims tokens.
//!
//! - `ClaimsCodec` turns a claim set into an HS256 token and back
//! - `TokenService` adds issuance, time-window validation, refresh and the
//!   expiry helpers on top of the codec

pub mod claims;
pub mod codec;
pub mod token_service;

pub use claims::{Claims, Identity, UserAttributes};
pub use codec::ClaimsCodec;
pub use token_service::{TokenConfig, TokenService};
