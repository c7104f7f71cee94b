//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mcp_http_requests_total` (counter): requests by method, status
//! - `mcp_http_request_duration_seconds` (histogram): latency by method
//! - `mcp_sessions_active` (gauge): sessions currently registered
//! - `mcp_sessions_created_total` / `mcp_sessions_closed_total` (counters)
//! - `mcp_bootstrap_failures_total` (counter): failed handshakes by capability
//! - `mcp_stdio_messages_total` (counter): lines handled in stdio mode
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "mcp_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("mcp_http_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_session_created() {
    counter!("mcp_sessions_created_total").increment(1);
}

pub fn record_session_closed() {
    counter!("mcp_sessions_closed_total").increment(1);
}

pub fn set_active_sessions(count: usize) {
    gauge!("mcp_sessions_active").set(count as f64);
}

pub fn record_bootstrap_failure(capability: &'static str) {
    counter!("mcp_bootstrap_failures_total", "capability" => capability).increment(1);
}

pub fn record_stdio_message() {
    counter!("mcp_stdio_messages_total").increment(1);
}
