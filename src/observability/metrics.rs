//! Metrics collection and exposition.
//!
//! # Metrics
//! - `coinfile_http_requests_total` (counter): requests by route, status
//! - `coinfile_uploads_total` (counter): uploads by storage type
//! - `coinfile_upload_bytes_total` (counter): bytes accepted
//! - `coinfile_payment_checks_total` (counter): payment checks by result
//! - `coinfile_mints_total` (counter): mint attempts by result
//! - `coinfile_rpc_duration_seconds` (histogram): RPC latency by method
//! - `coinfile_rpc_failures_total` (counter): calls where every endpoint failed
//!
//! Without an installed recorder every call here is a no-op.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16) {
    counter!(
        "coinfile_http_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_upload(storage_type: &'static str, bytes: u64) {
    counter!("coinfile_uploads_total", "storage_type" => storage_type).increment(1);
    counter!("coinfile_upload_bytes_total").increment(bytes);
}

pub fn record_payment_check(result: &'static str) {
    counter!("coinfile_payment_checks_total", "result" => result).increment(1);
}

pub fn record_mint(result: &'static str) {
    counter!("coinfile_mints_total", "result" => result).increment(1);
}

pub fn record_rpc_call(method: &'static str, start: Instant) {
    histogram!("coinfile_rpc_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rpc_failure(method: &'static str) {
    counter!("coinfile_rpc_failures_total", "method" => method).increment(1);
}
