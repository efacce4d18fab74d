//! Metrics collection and Prometheus exporter for netes-rs.
//!
//! This module provides metrics instrumentation for the proxy, covering
//! request routing outcomes, the per-cluster backend cache, and relay
//! tunnels.

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
        .map_err(|e| format!("invalid metrics listen address: {e}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install prometheus exporter: {e}"))?;

    Ok(())
}

// ============================================================================
// Metric Names
// ============================================================================

/// Total number of routed requests by outcome.
pub const REQUESTS_TOTAL: &str = "netes_requests_total";
/// Total number of backend cache hits.
pub const CACHE_HITS_TOTAL: &str = "netes_backend_cache_hits_total";
/// Total number of backend cache misses (slow path taken).
pub const CACHE_MISSES_TOTAL: &str = "netes_backend_cache_misses_total";
/// Number of live cached backends.
pub const BACKENDS_ACTIVE: &str = "netes_backends_active";
/// Total number of successful backend constructions.
pub const BACKEND_CONSTRUCTIONS_TOTAL: &str = "netes_backend_constructions_total";
/// Total number of failed backend constructions.
pub const BACKEND_CONSTRUCTION_FAILURES_TOTAL: &str = "netes_backend_construction_failures_total";
/// Total number of failed directory lookups.
pub const LOOKUP_FAILURES_TOTAL: &str = "netes_directory_lookup_failures_total";
/// Backend construction duration histogram (seconds).
pub const BACKEND_CONSTRUCTION_SECONDS: &str = "netes_backend_construction_seconds";
/// Total number of tunnel dials attempted.
pub const TUNNEL_DIALS_TOTAL: &str = "netes_tunnel_dials_total";
/// Total number of failed tunnel dials.
pub const TUNNEL_DIAL_FAILURES_TOTAL: &str = "netes_tunnel_dial_failures_total";
/// Tunnel dial duration histogram (seconds).
pub const TUNNEL_DIAL_SECONDS: &str = "netes_tunnel_dial_seconds";
/// Total number of errors by type.
pub const ERRORS_TOTAL: &str = "netes_errors_total";

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a routed request (outcome: "dispatched", "not_found", "error").
#[inline]
pub fn record_request(outcome: &'static str) {
    counter!(REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a backend cache hit.
#[inline]
pub fn record_cache_hit() {
    counter!(CACHE_HITS_TOTAL).increment(1);
}

/// Record a backend cache miss.
#[inline]
pub fn record_cache_miss() {
    counter!(CACHE_MISSES_TOTAL).increment(1);
}

/// Record a completed backend construction.
#[inline]
pub fn record_backend_constructed(duration_secs: f64) {
    counter!(BACKEND_CONSTRUCTIONS_TOTAL).increment(1);
    histogram!(BACKEND_CONSTRUCTION_SECONDS).record(duration_secs);
}

/// Record a failed backend construction.
#[inline]
pub fn record_backend_failed() {
    counter!(BACKEND_CONSTRUCTION_FAILURES_TOTAL).increment(1);
}

/// Record a failed directory lookup.
#[inline]
pub fn record_lookup_failure() {
    counter!(LOOKUP_FAILURES_TOTAL).increment(1);
}

/// Set the number of live cached backends.
#[inline]
#[allow(clippy::cast_precision_loss)]
pub fn set_backends_active(count: usize) {
    gauge!(BACKENDS_ACTIVE).set(count as f64);
}

/// Record a tunnel dial attempt and its duration.
#[inline]
pub fn record_tunnel_dial(duration_secs: f64, ok: bool) {
    counter!(TUNNEL_DIALS_TOTAL).increment(1);
    histogram!(TUNNEL_DIAL_SECONDS).record(duration_secs);
    if !ok {
        counter!(TUNNEL_DIAL_FAILURES_TOTAL).increment(1);
    }
}

/// Record an error by type.
#[inline]
pub fn record_error(error_type: &'static str) {
    counter!(ERRORS_TOTAL, "type" => error_type).increment(1);
}

// ============================================================================
// Error Type Constants (re-exported from netes-core)
// ============================================================================

pub use netes_core::{
    ERROR_BACKEND, ERROR_CONFIG, ERROR_DIAL, ERROR_IO, ERROR_LOOKUP, ERROR_PROTOCOL, ERROR_TIMEOUT,
};
