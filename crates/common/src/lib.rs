//! Wire-format utilities shared by every component that handles bearer tokens.

#![warn(clippy::pedantic)]

/// Module for token wire-format checks (size limits, segments, header, clock skew)
pub mod jwt;
