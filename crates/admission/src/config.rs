//! Admission configuration.
//!
//! Loaded from environment variables and injected into each component's
//! constructor through the per-component views (`token_config()`, ...).
//! Nothing here is global: two `Config` values can coexist in one process.
//! Sensitive fields are redacted in Debug output.

use crate::auth::TokenConfig;
use crate::cache::CacheConfig;
use crate::middleware::PipelineConfig;
use crate::rate_limit::TokenBucketConfig;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Minimum signing secret length in bytes (HS256 key size).
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Default token issuer.
pub const DEFAULT_JWT_ISSUER: &str = "admission";

/// Default token lifetime (24 hours).
pub const DEFAULT_JWT_EXPIRATION_SECONDS: i64 = 86_400;

/// Longest configurable token lifetime (30 days).
pub const MAX_JWT_EXPIRATION_SECONDS: i64 = 2_592_000;

/// Default sustained rate in requests per second.
pub const DEFAULT_RATE_LIMIT_RPS: u32 = 10;

/// Default burst size (bucket capacity).
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 20;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Longest configurable per-request deadline.
pub const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 300;

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_REQUEST_BODY_BYTES: u64 = 1_048_576;

/// Default Redis URL.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Default bound on a single cache round-trip.
pub const DEFAULT_CACHE_OP_TIMEOUT_MS: u64 = 5_000;

/// Upper bound on a single cache round-trip.
pub const MAX_CACHE_OP_TIMEOUT_MS: u64 = 10_000;

/// Default `Access-Control-Allow-Origin` value.
pub const DEFAULT_CORS_ALLOW_ORIGIN: &str = "*";

/// Admission configuration.
#[derive(Clone)]
pub struct Config {
    /// HMAC signing secret (at least 32 bytes).
    pub jwt_secret: SecretString,

    /// Issuer written into every token.
    pub jwt_issuer: String,

    /// Default token lifetime in seconds.
    pub jwt_expiration_seconds: i64,

    /// Clock skew tolerance for not-before / issued-at checks.
    pub jwt_clock_skew: Duration,

    /// Sustained admission rate in requests per second.
    pub rate_limit_rps: u32,

    /// Token bucket capacity.
    pub rate_limit_burst: u32,

    /// Per-request deadline applied by the pipeline.
    pub request_timeout: Duration,

    /// Largest accepted request body.
    pub max_request_body_bytes: u64,

    /// Redis connection URL (may contain credentials).
    pub redis_url: String,

    /// Bound on a single cache round-trip.
    pub cache_op_timeout: Duration,

    /// `Access-Control-Allow-Origin` response header value.
    pub cors_allow_origin: String,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_expiration_seconds", &self.jwt_expiration_seconds)
            .field("jwt_clock_skew", &self.jwt_clock_skew)
            .field("rate_limit_rps", &self.rate_limit_rps)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .field("request_timeout", &self.request_timeout)
            .field("max_request_body_bytes", &self.max_request_body_bytes)
            .field("redis_url", &"[REDACTED]")
            .field("cache_op_timeout", &self.cache_op_timeout)
            .field("cors_allow_origin", &self.cors_allow_origin)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT secret: {0}")]
    InvalidJwtSecret(String),

    #[error("Invalid JWT expiration configuration: {0}")]
    InvalidJwtExpiration(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimit(String),

    #[error("Invalid request timeout configuration: {0}")]
    InvalidRequestTimeout(String),

    #[error("Invalid cache timeout configuration: {0}")]
    InvalidCacheTimeout(String),

    #[error("Invalid request body limit configuration: {0}")]
    InvalidBodyLimit(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwt_secret = vars
            .get("JWT_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::InvalidJwtSecret(format!(
                "Expected at least {} bytes, got {}",
                MIN_JWT_SECRET_BYTES,
                jwt_secret.len()
            )));
        }
        let jwt_secret = SecretString::from(jwt_secret.clone());

        let jwt_issuer = vars
            .get("JWT_ISSUER")
            .cloned()
            .unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string());

        let jwt_expiration_seconds = match vars.get("JWT_EXPIRATION_SECONDS") {
            Some(value_str) => {
                let value: i64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwtExpiration(format!(
                        "JWT_EXPIRATION_SECONDS must be a valid integer, got '{}': {}",
                        value_str, e
                    ))
                })?;
                if value <= 0 || value > MAX_JWT_EXPIRATION_SECONDS {
                    return Err(ConfigError::InvalidJwtExpiration(format!(
                        "JWT_EXPIRATION_SECONDS must be between 1 and {}, got {}",
                        MAX_JWT_EXPIRATION_SECONDS, value
                    )));
                }
                value
            }
            None => DEFAULT_JWT_EXPIRATION_SECONDS,
        };

        let jwt_clock_skew = match vars.get("JWT_CLOCK_SKEW_SECONDS") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwtClockSkew(format!(
                        "JWT_CLOCK_SKEW_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;
                if value == 0 {
                    return Err(ConfigError::InvalidJwtClockSkew(
                        "JWT_CLOCK_SKEW_SECONDS must be greater than 0".to_string(),
                    ));
                }
                if value > MAX_CLOCK_SKEW.as_secs() {
                    return Err(ConfigError::InvalidJwtClockSkew(format!(
                        "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                        MAX_CLOCK_SKEW.as_secs(),
                        value
                    )));
                }
                Duration::from_secs(value)
            }
            None => DEFAULT_CLOCK_SKEW,
        };

        let rate_limit_rps = parse_positive_u32(vars, "RATE_LIMIT_RPS", DEFAULT_RATE_LIMIT_RPS)?;
        let rate_limit_burst =
            parse_positive_u32(vars, "RATE_LIMIT_BURST", DEFAULT_RATE_LIMIT_BURST)?;

        let request_timeout = match vars.get("REQUEST_TIMEOUT_SECONDS") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidRequestTimeout(format!(
                        "REQUEST_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;
                if value == 0 || value > MAX_REQUEST_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidRequestTimeout(format!(
                        "REQUEST_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_REQUEST_TIMEOUT_SECONDS, value
                    )));
                }
                Duration::from_secs(value)
            }
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        };

        let max_request_body_bytes = match vars.get("MAX_REQUEST_BODY_BYTES") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidBodyLimit(format!(
                        "MAX_REQUEST_BODY_BYTES must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;
                if value == 0 {
                    return Err(ConfigError::InvalidBodyLimit(
                        "MAX_REQUEST_BODY_BYTES must be greater than 0".to_string(),
                    ));
                }
                value
            }
            None => DEFAULT_MAX_REQUEST_BODY_BYTES,
        };

        let redis_url = vars
            .get("REDIS_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let cache_op_timeout = match vars.get("CACHE_OP_TIMEOUT_MS") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidCacheTimeout(format!(
                        "CACHE_OP_TIMEOUT_MS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;
                if value == 0 || value > MAX_CACHE_OP_TIMEOUT_MS {
                    return Err(ConfigError::InvalidCacheTimeout(format!(
                        "CACHE_OP_TIMEOUT_MS must be between 1 and {}, got {}",
                        MAX_CACHE_OP_TIMEOUT_MS, value
                    )));
                }
                Duration::from_millis(value)
            }
            None => Duration::from_millis(DEFAULT_CACHE_OP_TIMEOUT_MS),
        };

        let cors_allow_origin = vars
            .get("CORS_ALLOW_ORIGIN")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CORS_ALLOW_ORIGIN.to_string());

        Ok(Config {
            jwt_secret,
            jwt_issuer,
            jwt_expiration_seconds,
            jwt_clock_skew,
            rate_limit_rps,
            rate_limit_burst,
            request_timeout,
            max_request_body_bytes,
            redis_url,
            cache_op_timeout,
            cors_allow_origin,
        })
    }

    /// Token service view.
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            secret: self.jwt_secret.clone(),
            issuer: self.jwt_issuer.clone(),
            default_ttl: chrono::Duration::seconds(self.jwt_expiration_seconds),
            clock_skew: self.jwt_clock_skew,
        }
    }

    /// In-process rate limiter view.
    pub fn rate_limit_config(&self) -> TokenBucketConfig {
        TokenBucketConfig {
            capacity: self.rate_limit_burst,
            refill_per_second: f64::from(self.rate_limit_rps),
        }
    }

    /// Cache accessor view.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            redis_url: self.redis_url.clone(),
            op_timeout: self.cache_op_timeout,
        }
    }

    /// Pipeline view.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            request_timeout: self.request_timeout,
            max_body_bytes: self.max_request_body_bytes,
            cors_allow_origin: self.cors_allow_origin.clone(),
        }
    }
}

fn parse_positive_u32(
    vars: &HashMap<String, String>,
    name: &str,
    default: u32,
) -> Result<u32, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u32 = value_str.parse().map_err(|e| {
        ConfigError::InvalidRateLimit(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidRateLimit(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const TEST_SECRET: &str = "test-secret-key-that-is-at-least-32-bytes-long";

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([("JWT_SECRET".to_string(), TEST_SECRET.to_string())])
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.jwt_secret.expose_secret(), TEST_SECRET);
        assert_eq!(config.jwt_issuer, DEFAULT_JWT_ISSUER);
        assert_eq!(config.jwt_expiration_seconds, DEFAULT_JWT_EXPIRATION_SECONDS);
        assert_eq!(config.jwt_clock_skew, DEFAULT_CLOCK_SKEW);
        assert_eq!(config.rate_limit_rps, DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.rate_limit_burst, DEFAULT_RATE_LIMIT_BURST);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(config.cache_op_timeout, Duration::from_millis(5_000));
        assert_eq!(config.cors_allow_origin, "*");
    }

    #[test]
    fn test_from_vars_custom_values() {
        let mut vars = base_vars();
        vars.insert("JWT_ISSUER".to_string(), "user-service".to_string());
        vars.insert("JWT_EXPIRATION_SECONDS".to_string(), "900".to_string());
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "60".to_string());
        vars.insert("RATE_LIMIT_RPS".to_string(), "5".to_string());
        vars.insert("RATE_LIMIT_BURST".to_string(), "8".to_string());
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "10".to_string());
        vars.insert("REDIS_URL".to_string(), "redis://cache:6379/2".to_string());
        vars.insert("CACHE_OP_TIMEOUT_MS".to_string(), "2500".to_string());
        vars.insert(
            "CORS_ALLOW_ORIGIN".to_string(),
            "https://app.example.com".to_string(),
        );

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.jwt_issuer, "user-service");
        assert_eq!(config.jwt_expiration_seconds, 900);
        assert_eq!(config.jwt_clock_skew, Duration::from_secs(60));
        assert_eq!(config.rate_limit_rps, 5);
        assert_eq!(config.rate_limit_burst, 8);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.redis_url, "redis://cache:6379/2");
        assert_eq!(config.cache_op_timeout, Duration::from_millis(2500));
        assert_eq!(config.cors_allow_origin, "https://app.example.com");
    }

    #[test]
    fn test_from_vars_missing_secret() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "JWT_SECRET"));
    }

    #[test]
    fn test_from_vars_secret_too_short() {
        let vars = HashMap::from([("JWT_SECRET".to_string(), "short".to_string())]);
        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtSecret(msg)) if msg.contains("at least 32 bytes, got 5"))
        );
    }

    #[test]
    fn test_from_vars_invalid_expiration() {
        for bad in ["abc", "0", "-60", "2592001", "9223372036854775807"] {
            let mut vars = base_vars();
            vars.insert("JWT_EXPIRATION_SECONDS".to_string(), bad.to_string());
            assert!(
                matches!(
                    Config::from_vars(&vars),
                    Err(ConfigError::InvalidJwtExpiration(_))
                ),
                "JWT_EXPIRATION_SECONDS={bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_vars_clock_skew_bounds() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "600".to_string());
        assert_eq!(
            Config::from_vars(&vars).unwrap().jwt_clock_skew,
            Duration::from_secs(600)
        );

        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "601".to_string());
        assert!(
            matches!(Config::from_vars(&vars), Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must not exceed 600"))
        );

        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidJwtClockSkew(_))
        ));
    }

    #[test]
    fn test_from_vars_invalid_rate_limit() {
        let mut vars = base_vars();
        vars.insert("RATE_LIMIT_RPS".to_string(), "0".to_string());
        assert!(
            matches!(Config::from_vars(&vars), Err(ConfigError::InvalidRateLimit(msg)) if msg.contains("RATE_LIMIT_RPS"))
        );

        let mut vars = base_vars();
        vars.insert("RATE_LIMIT_BURST".to_string(), "lots".to_string());
        assert!(
            matches!(Config::from_vars(&vars), Err(ConfigError::InvalidRateLimit(msg)) if msg.contains("RATE_LIMIT_BURST"))
        );
    }

    #[test]
    fn test_from_vars_expiration_upper_bound() {
        let mut vars = base_vars();
        vars.insert(
            "JWT_EXPIRATION_SECONDS".to_string(),
            MAX_JWT_EXPIRATION_SECONDS.to_string(),
        );
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(
            config.token_config().default_ttl,
            chrono::Duration::seconds(MAX_JWT_EXPIRATION_SECONDS)
        );
    }

    #[test]
    fn test_from_vars_invalid_request_timeout() {
        for bad in ["0", "301", "18446744073709551615"] {
            let mut vars = base_vars();
            vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), bad.to_string());
            assert!(
                matches!(
                    Config::from_vars(&vars),
                    Err(ConfigError::InvalidRequestTimeout(_))
                ),
                "REQUEST_TIMEOUT_SECONDS={bad} should be rejected"
            );
        }

        let mut vars = base_vars();
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "300".to_string());
        assert_eq!(
            Config::from_vars(&vars).unwrap().request_timeout,
            Duration::from_secs(MAX_REQUEST_TIMEOUT_SECONDS)
        );
    }

    #[test]
    fn test_from_vars_body_limit() {
        let config = Config::from_vars(&base_vars()).unwrap();
        assert_eq!(config.max_request_body_bytes, DEFAULT_MAX_REQUEST_BODY_BYTES);
        assert_eq!(
            config.pipeline_config().max_body_bytes,
            DEFAULT_MAX_REQUEST_BODY_BYTES
        );

        for bad in ["0", "-1", "big"] {
            let mut vars = base_vars();
            vars.insert("MAX_REQUEST_BODY_BYTES".to_string(), bad.to_string());
            assert!(
                matches!(
                    Config::from_vars(&vars),
                    Err(ConfigError::InvalidBodyLimit(_))
                ),
                "MAX_REQUEST_BODY_BYTES={bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_vars_cache_timeout_bounds() {
        let mut vars = base_vars();
        vars.insert("CACHE_OP_TIMEOUT_MS".to_string(), "10001".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidCacheTimeout(_))
        ));

        vars.insert("CACHE_OP_TIMEOUT_MS".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidCacheTimeout(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut vars = base_vars();
        vars.insert(
            "REDIS_URL".to_string(),
            "redis://:hunter2@cache:6379".to_string(),
        );
        let config = Config::from_vars(&vars).unwrap();

        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(TEST_SECRET));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_component_views() {
        let mut vars = base_vars();
        vars.insert("RATE_LIMIT_RPS".to_string(), "4".to_string());
        vars.insert("RATE_LIMIT_BURST".to_string(), "6".to_string());
        let config = Config::from_vars(&vars).unwrap();

        let token = config.token_config();
        assert_eq!(token.issuer, DEFAULT_JWT_ISSUER);
        assert_eq!(token.default_ttl, chrono::Duration::seconds(86_400));
        assert_eq!(token.secret.expose_secret(), TEST_SECRET);

        let bucket = config.rate_limit_config();
        assert_eq!(bucket.capacity, 6);
        assert!((bucket.refill_per_second - 4.0).abs() < f64::EPSILON);

        let cache = config.cache_config();
        assert_eq!(cache.op_timeout, Duration::from_millis(5_000));

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.request_timeout, Duration::from_secs(30));
    }
}
