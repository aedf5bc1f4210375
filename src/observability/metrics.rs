//! Metrics collection and exposition.
//!
//! # Metrics
//! - `upload_admissions_total` (counter): gate verdicts by `verdict`
//! - `upload_throttle_blocks_total` (counter): addresses moved to the blocked set
//! - `upload_throttle_resets_total` (counter): whole-window resets
//! - `upload_dropped_connections_total` (counter): connections closed unanswered
//! - `upload_module_outcomes_total` (counter): dispatch results by `module`, `outcome`
//! - `upload_requests_total` (counter): responses by `method`, `status`
//! - `upload_request_duration_seconds` (histogram): latency distribution
//! - `upload_active_connections` (gauge): current connection count
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Label values are static or low-cardinality; peer addresses are never labels

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics exporter started");
    Ok(())
}

pub fn record_admission(verdict: &'static str) {
    counter!("upload_admissions_total", "verdict" => verdict).increment(1);
}

pub fn record_throttle_block() {
    counter!("upload_throttle_blocks_total").increment(1);
}

pub fn record_throttle_reset() {
    counter!("upload_throttle_resets_total").increment(1);
}

pub fn record_dropped_connection() {
    counter!("upload_dropped_connections_total").increment(1);
}

pub fn record_module_outcome(module: &'static str, outcome: &'static str) {
    counter!("upload_module_outcomes_total", "module" => module, "outcome" => outcome).increment(1);
}

/// Record a completed request with its latency.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!("upload_requests_total", "method" => method.clone(), "status" => status.clone())
        .increment(1);
    histogram!("upload_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn set_active_connections(count: usize) {
    gauge!("upload_active_connections").set(count as f64);
}
