//! Metrics definitions for the meeting proxy.
//!
//! All metrics follow Prometheus naming conventions:
//! - `mp_` prefix for meeting proxy
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: a handful of values (meeting ids are collapsed to `{id}`)
//! - `status`: 3 values (success, error, timeout)
//! - `operation`: bounded by code (list_meetings, insert_meeting, etc.)
//! - `error_type`: bounded by error variants

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("mp_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("mp_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        // Provider round trips are bounded by the request timeout
        .set_buckets_for_metric(
            Matcher::Prefix("mp_zoom_request".to_string()),
            &[
                0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set provider request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("mp_token_acquisition".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000],
        )
        .map_err(|e| format!("Failed to set token acquisition buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `mp_http_requests_total`, `mp_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// This captures ALL HTTP responses including framework-level errors like
/// malformed JSON, unknown routes and wrong methods.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("mp_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("mp_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/ready" | "/metrics" | "/meetings" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

/// Replaces meeting ids with a placeholder.
fn normalize_dynamic_endpoint(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/meetings/") {
        if !rest.is_empty() && !rest.contains('/') {
            return "/meetings/{id}".to_string();
        }
    }

    // Unknown paths normalized to "/other" to bound cardinality
    "/other".to_string()
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `mp_db_query_duration_seconds`, `mp_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &str, status: &str, duration: Duration) {
    histogram!("mp_db_query_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("mp_db_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Meeting Provider Metrics
// ============================================================================

/// Record a call to the meeting provider API.
///
/// Metric: `mp_zoom_request_duration_seconds`, `mp_zoom_requests_total`
/// Labels: `operation`, `status`
///
/// `status` is "success", "rejected" (non-success status) or "error"
/// (transport failure).
pub fn record_zoom_request(operation: &str, status: &str, duration: Duration) {
    histogram!("mp_zoom_request_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("mp_zoom_requests_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record a bearer token acquisition attempt.
///
/// Metric: `mp_token_acquisitions_total` (labels: `status`, `error_type`),
/// `mp_token_acquisition_duration_seconds`
///
/// Called from the acquisition callback wired in `main.rs`.
pub fn record_token_acquisition(status: &str, error_type: Option<&str>, duration: Duration) {
    histogram!("mp_token_acquisition_duration_seconds").record(duration.as_secs_f64());

    counter!("mp_token_acquisitions_total",
        "status" => status.to_string(),
        "error_type" => error_type.unwrap_or("none").to_string()
    )
    .increment(1);
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Record a provider mutation whose local write failed.
///
/// Metric: `mp_reconciliation_required_total`
/// Labels: `operation` (create, update, delete)
pub fn record_reconciliation_required(operation: &str) {
    counter!("mp_reconciliation_required_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}
