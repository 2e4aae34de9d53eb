//! Metrics collection using Prometheus
//!
//! Centralized registry for:
//! - Cache effectiveness (hits, misses, invalidations)
//! - Download outcomes by format
//! - Upload outcomes by representation
//! - Dispatch decisions by route and queue depth

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec, IntGauge,
};

lazy_static! {
    /// Requests satisfied by re-sending a previously uploaded artifact
    pub static ref CACHE_HIT_TOTAL: IntCounter = register_int_counter!(
        "dorarelay_cache_hit_total",
        "Requests satisfied from the dedup cache"
    )
    .unwrap();

    /// Requests that required a fresh download (including stale-handle falls)
    pub static ref CACHE_MISS_TOTAL: IntCounter = register_int_counter!(
        "dorarelay_cache_miss_total",
        "Requests that missed the dedup cache"
    )
    .unwrap();

    /// Cache entries dropped after a rejected handle
    pub static ref CACHE_INVALIDATION_TOTAL: IntCounter = register_int_counter!(
        "dorarelay_cache_invalidation_total",
        "Dedup cache entries invalidated after transport rejection"
    )
    .unwrap();

    /// Successful downloads by format (mp4/m4a/file)
    pub static ref DOWNLOAD_SUCCESS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dorarelay_download_success_total",
        "Total number of successful downloads",
        &["format"]
    )
    .unwrap();

    /// Failed downloads by format and error type
    pub static ref DOWNLOAD_FAILURE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dorarelay_download_failure_total",
        "Total number of failed downloads",
        &["format", "error_type"]
    )
    .unwrap();

    /// Successful deliveries by final representation
    pub static ref UPLOAD_SUCCESS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dorarelay_upload_success_total",
        "Total number of delivered artifacts by representation",
        &["representation"]
    )
    .unwrap();

    /// Hard delivery failures by error type
    pub static ref UPLOAD_FAILURE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dorarelay_upload_failure_total",
        "Total number of failed deliveries",
        &["error_type"]
    )
    .unwrap();

    /// Dispatch decisions by selected route
    pub static ref DISPATCH_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dorarelay_dispatch_total",
        "Tasks dispatched by selected worker route",
        &["route"]
    )
    .unwrap();

    /// Current number of queued (not yet claimed) tasks across all routes
    pub static ref QUEUE_DEPTH: IntGauge = register_int_gauge!(
        "dorarelay_queue_depth",
        "Pending tasks across all route queues"
    )
    .unwrap();
}

/// Record a dedup cache hit.
pub fn record_cache_hit() {
    CACHE_HIT_TOTAL.inc();
}

/// Record a dedup cache miss.
pub fn record_cache_miss() {
    CACHE_MISS_TOTAL.inc();
}

/// Record an invalidated cache entry.
pub fn record_cache_invalidation() {
    CACHE_INVALIDATION_TOTAL.inc();
}

/// Record a successful download.
pub fn record_download_success(format: &str) {
    DOWNLOAD_SUCCESS_TOTAL.with_label_values(&[format]).inc();
}

/// Record a failed download.
pub fn record_download_failure(format: &str, error_type: &str) {
    DOWNLOAD_FAILURE_TOTAL.with_label_values(&[format, error_type]).inc();
}

/// Record a delivered artifact.
pub fn record_upload_success(representation: &str) {
    UPLOAD_SUCCESS_TOTAL.with_label_values(&[representation]).inc();
}

/// Record a hard delivery failure.
pub fn record_upload_failure(error_type: &str) {
    UPLOAD_FAILURE_TOTAL.with_label_values(&[error_type]).inc();
}

/// Record a dispatch decision.
pub fn record_dispatch(route: &str) {
    DISPATCH_TOTAL.with_label_values(&[route]).inc();
}

/// Update the global queue depth gauge.
pub fn update_queue_depth(depth: usize) {
    QUEUE_DEPTH.set(depth as i64);
}

/// Render all registered metrics in the Prometheus text format.
///
/// Used by the /stats command and the `stats` CLI subcommand.
pub fn gather_text() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buf) {
        log::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_counters_increment() {
        let hits_before = CACHE_HIT_TOTAL.get();
        let misses_before = CACHE_MISS_TOTAL.get();

        record_cache_hit();
        record_cache_miss();
        record_cache_miss();

        assert_eq!(CACHE_HIT_TOTAL.get(), hits_before + 1);
        assert_eq!(CACHE_MISS_TOTAL.get(), misses_before + 2);
    }

    #[test]
    fn test_gather_text_contains_registered_metrics() {
        record_dispatch("worker-a");
        let text = gather_text();
        assert!(text.contains("dorarelay_dispatch_total"));
    }
}
