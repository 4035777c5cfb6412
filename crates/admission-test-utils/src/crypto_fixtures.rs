//! Deterministic signing secrets.
//!
//! Both are at least 32 bytes so they pass configuration validation.

/// Secret the services under test are configured with.
pub const TEST_JWT_SECRET: &str = "test-secret-0123456789abcdef0123456789abcdef";

/// A different valid secret, for forging tokens the service must reject.
pub const TEST_OTHER_JWT_SECRET: &str = "other-secret-fedcba9876543210fedcba9876543210";
