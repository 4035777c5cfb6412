//! Request admission and data-access primitives.
//!
//! # Modules
//!
//! - [`auth`] - signed claims tokens: issue, validate, refresh
//! - [`rate_limit`] - admission control behind the [`rate_limit::RateLimiter`] capability
//! - [`cache`] - cache-aside accessor with TTLs and atomic counters
//! - [`mutation`] - allow-listed, parameterized partial updates
//! - [`middleware`] - the ordered request pipeline
//! - [`deadline`] - per-request cancellable deadlines
//!
//! Components are constructed from values in [`config::Config`]; nothing here
//! holds process-global state.

pub mod auth;
pub mod cache;
pub mod config;
pub mod deadline;
pub mod errors;
pub mod middleware;
pub mod mutation;
pub mod observability;
pub mod rate_limit;
