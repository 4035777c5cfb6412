//! # Admission Test Utilities
//!
//! Shared fixtures for the admission crate's tests:
//! - Deterministic signing secrets
//! - `TestTokenBuilder` for forging tokens with arbitrary claims and secrets
//! - Cache backends that fail or stall on demand
//! - `PipelineHarness` for driving a pipeline-wrapped router in-process
//!
//! ## Usage
//!
//! ```rust,ignore
//! use admission_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let harness = PipelineHarness::builder().burst(3).build();
//!     let token = TestTokenBuilder::new().with_subject("alice").build(TEST_JWT_SECRET);
//!
//!     let response = harness.get_with_token("/whoami", &token).await;
//!     assert_eq!(response.status, StatusCode::OK);
//! }
//! ```

pub mod cache_fixtures;
pub mod crypto_fixtures;
pub mod pipeline_harness;
pub mod token_builders;

pub use cache_fixtures::*;
pub use crypto_fixtures::*;
pub use pipeline_harness::*;
pub use token_builders::*;
