//! Metrics collection and exposition.
//!
//! # Metrics
//! - `render_requests_total` (counter): requests by outcome
//!   (`rendered`, `passthrough`, `error`, `timeout`)
//! - `render_duration_seconds` (histogram): time until the render service answered
//! - `render_upstream_status_total` (counter): render service status codes
//! - `render_relay_failures_total` (counter): bodies that were not fully sent
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exporter only when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_passthrough() {
    metrics::counter!("render_requests_total", "outcome" => "passthrough").increment(1);
}

pub fn record_render(status: u16, start_time: Instant) {
    metrics::counter!("render_requests_total", "outcome" => "rendered").increment(1);
    metrics::counter!("render_upstream_status_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("render_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

pub fn record_render_failure(timeout: bool, start_time: Instant) {
    let outcome = if timeout { "timeout" } else { "error" };
    metrics::counter!("render_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("render_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

pub fn record_relay_failure() {
    metrics::counter!("render_relay_failures_total").increment(1);
}
