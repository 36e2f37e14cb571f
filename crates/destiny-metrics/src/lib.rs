//! Metrics collection and Prometheus exporter for destiny-rs.
//!
//! This module provides metrics instrumentation for the destiny server,
//! including analysis volume, quota decisions, image storage and error rates.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize Prometheus metrics exporter.
///
/// Starts an HTTP server on the given address to expose metrics.
/// Returns an error message if binding fails.
pub fn init_prometheus(listen: &str) -> Result<(), String> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| format!("invalid metrics listen address: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install prometheus exporter: {}", e))?;

    Ok(())
}

// ============================================================================
// Metric Names
// ============================================================================

/// Total number of HTTP requests by route and status.
pub const HTTP_REQUESTS_TOTAL: &str = "destiny_http_requests_total";
/// HTTP request duration histogram (seconds).
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "destiny_http_request_duration_seconds";
/// Total number of analysis requests admitted by the quota.
pub const ANALYSIS_REQUESTS_TOTAL: &str = "destiny_analysis_requests_total";
/// Analysis duration histogram (seconds), quota check excluded.
pub const ANALYSIS_DURATION_SECONDS: &str = "destiny_analysis_duration_seconds";
/// Total number of requests denied by the daily quota.
pub const QUOTA_DENIED_TOTAL: &str = "destiny_quota_denied_total";
/// Compatibility scores handed out, by label.
pub const SCORES_TOTAL: &str = "destiny_scores_total";
/// Total number of images saved, by format and source.
pub const IMAGES_SAVED_TOTAL: &str = "destiny_images_saved_total";
/// Total bytes of image data saved.
pub const IMAGE_BYTES_TOTAL: &str = "destiny_image_bytes_total";
/// Day buckets removed by image cleanup.
pub const CLEANUP_BUCKETS_REMOVED_TOTAL: &str = "destiny_cleanup_buckets_removed_total";
/// Files removed by image cleanup.
pub const CLEANUP_FILES_REMOVED_TOTAL: &str = "destiny_cleanup_files_removed_total";
/// Day buckets cleanup failed to remove.
pub const CLEANUP_FAILURES_TOTAL: &str = "destiny_cleanup_failures_total";
/// Stale usage records removed by the sweep.
pub const USAGE_RECORDS_SWEPT_TOTAL: &str = "destiny_usage_records_swept_total";
/// Provider calls that fell back to the mock implementation.
pub const PROVIDER_FALLBACK_TOTAL: &str = "destiny_provider_fallback_total";
/// Total number of errors by type.
pub const ERRORS_TOTAL: &str = "destiny_errors_total";
/// Unix timestamp of the last completed maintenance pass.
pub const MAINTENANCE_LAST_RUN: &str = "destiny_maintenance_last_run_timestamp";

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a finished HTTP request.
/// The route should be the matched route template, not the raw path, to keep
/// label cardinality bounded.
#[inline]
pub fn record_http_request(route: &str, status: u16, duration_secs: f64) {
    counter!(HTTP_REQUESTS_TOTAL, "route" => route.to_owned(), "status" => status.to_string())
        .increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "route" => route.to_owned()).record(duration_secs);
}

/// Record an admitted analysis request.
#[inline]
pub fn record_analysis_request() {
    counter!(ANALYSIS_REQUESTS_TOTAL).increment(1);
}

/// Record analysis duration.
#[inline]
pub fn record_analysis_duration(duration_secs: f64) {
    histogram!(ANALYSIS_DURATION_SECONDS).record(duration_secs);
}

/// Record a quota denial.
#[inline]
pub fn record_quota_denied() {
    counter!(QUOTA_DENIED_TOTAL).increment(1);
}

/// Record a generated score by label (e.g. "destined", "resonant").
#[inline]
pub fn record_score(label: &'static str) {
    counter!(SCORES_TOTAL, "label" => label).increment(1);
}

/// Record a saved image (source: "upload" or "generated").
#[inline]
pub fn record_image_saved(format: &'static str, source: &'static str, bytes: u64) {
    counter!(IMAGES_SAVED_TOTAL, "format" => format, "source" => source).increment(1);
    counter!(IMAGE_BYTES_TOTAL).increment(bytes);
}

/// Record the outcome of an image cleanup pass.
#[inline]
pub fn record_cleanup(buckets: u64, files: u64, failures: u64) {
    counter!(CLEANUP_BUCKETS_REMOVED_TOTAL).increment(buckets);
    counter!(CLEANUP_FILES_REMOVED_TOTAL).increment(files);
    counter!(CLEANUP_FAILURES_TOTAL).increment(failures);
}

/// Record stale usage records removed.
#[inline]
pub fn record_usage_swept(records: u64) {
    counter!(USAGE_RECORDS_SWEPT_TOTAL).increment(records);
}

/// Record a provider fallback (provider: "image" or "narrative").
#[inline]
pub fn record_provider_fallback(provider: &'static str, reason: &'static str) {
    counter!(PROVIDER_FALLBACK_TOTAL, "provider" => provider, "reason" => reason).increment(1);
}

/// Record an error by type.
#[inline]
pub fn record_error(error_type: &'static str) {
    counter!(ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Set the time of the last maintenance pass.
#[inline]
pub fn set_maintenance_last_run(unix_secs: i64) {
    gauge!(MAINTENANCE_LAST_RUN).set(unix_secs as f64);
}

// ============================================================================
// Error Type Constants (re-exported from destiny-core)
// ============================================================================

pub use destiny_core::{
    ERROR_CONFIG, ERROR_IMAGE_STORE, ERROR_IO, ERROR_PROVIDER, ERROR_REQUEST, ERROR_TIMEOUT,
    ERROR_USAGE_STORE,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_prefixed() {
        for name in [
            HTTP_REQUESTS_TOTAL,
            ANALYSIS_REQUESTS_TOTAL,
            QUOTA_DENIED_TOTAL,
            IMAGES_SAVED_TOTAL,
            CLEANUP_BUCKETS_REMOVED_TOTAL,
            PROVIDER_FALLBACK_TOTAL,
            ERRORS_TOTAL,
        ] {
            assert!(name.starts_with("destiny_"), "{name}");
        }
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_analysis_request();
        record_quota_denied();
        record_image_saved("png", "upload", 128);
        record_cleanup(1, 3, 0);
        record_provider_fallback("image", "timeout");
        record_error(ERROR_IO);
    }

    #[test]
    fn init_rejects_bad_address() {
        let err = init_prometheus("not-an-address").unwrap_err();
        assert!(err.contains("invalid metrics listen address"));
    }
}
