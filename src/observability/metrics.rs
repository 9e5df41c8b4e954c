//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_auth_resolutions_total` (counter): which auth tier decided
//! - `gateway_license_lookups_total` (counter): cache hit, miss or coalesced
//! - `gateway_license_cache_entries` (gauge): keys held by the license cache
//! - `gateway_service_health` (gauge): 1=online, 0=offline
//! - `gateway_rate_limited_total` (counter): requests rejected by the limiter
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram, Label};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, service: &str, started: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("service", service.to_string()),
    ];
    counter!("gateway_requests_total", labels.clone()).increment(1);
    histogram!("gateway_request_duration_seconds", labels).record(started.elapsed().as_secs_f64());
}

pub fn record_auth_resolution(path: &'static str) {
    counter!("gateway_auth_resolutions_total", "path" => path).increment(1);
}

pub fn record_license_lookup(result: &'static str) {
    counter!("gateway_license_lookups_total", "result" => result).increment(1);
}

pub fn record_license_cache_size(entries: usize) {
    gauge!("gateway_license_cache_entries").set(entries as f64);
}

pub fn record_service_health(service: &str, online: bool) {
    gauge!("gateway_service_health", "service" => service.to_string()).set(if online { 1.0 } else { 0.0 });
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}
