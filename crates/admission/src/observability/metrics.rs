//! Metrics definitions for the admission layer.
//!
//! All metrics follow Prometheus naming conventions:
//! - `admission_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: `success` or an `AuthError` label for token validation
//! - `decision`: `allowed` or `denied`
//! - `operation`: bounded by `CacheStore` methods
//! - `method`: standard HTTP methods, anything else as `OTHER`
//! - `status`: 3 values (success, error, timeout)
//!
//! No exporter is installed here; without a recorder every call is a no-op.

use metrics::{counter, histogram};
use std::time::Duration;

// ============================================================================
// Token Metrics
// ============================================================================

/// Record a token validation outcome.
///
/// Metric: `admission_token_validations_total`
/// Labels: `outcome`
pub fn record_token_validation(outcome: &'static str) {
    counter!("admission_token_validations_total", "outcome" => outcome).increment(1);
}

/// Record a successfully issued token.
///
/// Metric: `admission_tokens_issued_total`
pub fn record_token_issued() {
    counter!("admission_tokens_issued_total").increment(1);
}

// ============================================================================
// Rate Limit Metrics
// ============================================================================

/// Record a rate limiter decision.
///
/// Metric: `admission_rate_limit_decisions_total`
/// Labels: `decision`
pub fn record_rate_limit_decision(allowed: bool) {
    let decision = if allowed { "allowed" } else { "denied" };
    counter!("admission_rate_limit_decisions_total", "decision" => decision).increment(1);
}

// ============================================================================
// Cache Metrics
// ============================================================================

/// Record a cache operation outcome.
///
/// Metric: `admission_cache_operations_total`
/// Labels: `operation`, `outcome` (hit, miss, ok, error, timeout)
pub fn record_cache_operation(operation: &'static str, outcome: &'static str) {
    counter!("admission_cache_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

// ============================================================================
// Pipeline Metrics
// ============================================================================

/// Record a fault caught by the pipeline's fault boundary.
///
/// Metric: `admission_pipeline_faults_total`
pub fn record_pipeline_fault() {
    counter!("admission_pipeline_faults_total").increment(1);
}

/// Record HTTP request completion.
///
/// Metric: `admission_http_requests_total`, `admission_http_request_duration_seconds`
/// Labels: `method`, `status`
pub fn record_http_request(method: &str, status_code: u16, duration: Duration) {
    let status = categorize_status_code(status_code);
    let method = categorize_method(method);

    histogram!("admission_http_request_duration_seconds",
        "method" => method,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("admission_http_requests_total",
        "method" => method,
        "status" => status
    )
    .increment(1);
}

/// Extension methods are client-chosen, so they share one label value.
fn categorize_method(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "PATCH" => "PATCH",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        _ => "OTHER",
    }
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(429), "error");
        assert_eq!(categorize_status_code(500), "error");
    }

    #[test]
    fn test_categorize_method() {
        assert_eq!(categorize_method("GET"), "GET");
        assert_eq!(categorize_method("OPTIONS"), "OPTIONS");
        assert_eq!(categorize_method("PROPFIND"), "OTHER");
        assert_eq!(categorize_method("X-RANDOM-0001"), "OTHER");
        assert_eq!(categorize_method("get"), "OTHER");
    }

    #[test]
    fn test_arbitrary_methods_share_one_series() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            for i in 0..50 {
                record_http_request(&format!("CUSTOM{i}"), 200, Duration::from_millis(1));
            }
        });

        let requests: Vec<_> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, _)| key.key().name() == "admission_http_requests_total")
            .collect();
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests.first(), Some((_, _, _, DebugValue::Counter(50)))));
        assert!(requests.iter().all(|(key, _, _, _)| key
            .key()
            .labels()
            .any(|l| l.key() == "method" && l.value() == "OTHER")));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_token_validation("success");
        record_token_issued();
        record_rate_limit_decision(true);
        record_cache_operation("get", "hit");
        record_pipeline_fault();
        record_http_request("GET", 200, Duration::from_millis(5));
    }

    #[test]
    fn test_metric_names_and_labels() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_rate_limit_decision(true);
            record_rate_limit_decision(false);
            record_rate_limit_decision(false);
            record_token_validation("expired");
            record_http_request("POST", 429, Duration::from_millis(2));
        });

        let snapshot = snapshotter.snapshot().into_vec();

        let denied = snapshot.iter().find(|(key, _, _, _)| {
            key.key().name() == "admission_rate_limit_decisions_total"
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == "decision" && l.value() == "denied")
        });
        assert!(matches!(denied, Some((_, _, _, DebugValue::Counter(2)))));

        let names: Vec<&str> = snapshot
            .iter()
            .map(|(key, _, _, _)| key.key().name())
            .collect();
        assert!(names.contains(&"admission_token_validations_total"));
        assert!(names.contains(&"admission_http_requests_total"));
        assert!(names.contains(&"admission_http_request_duration_seconds"));
    }
}
