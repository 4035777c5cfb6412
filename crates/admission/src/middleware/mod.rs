//! Request admission middleware.
//!
//! Each stage is an axum `from_fn` middleware that either calls the next
//! stage or aborts with an [`AdmissionError`](crate::errors::AdmissionError).
//! [`Pipeline`] assembles them in a fixed order.

pub mod auth;
pub mod body_limit;
pub mod context;
pub mod deadline;
pub mod fault_boundary;
pub mod pipeline;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use context::RequestContext;
pub use pipeline::{Pipeline, PipelineConfig, PipelineState, StageOrder};
pub use request_id::REQUEST_ID_HEADER;
