//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kernel_requests_total` (counter): requests seen by the gateway
//! - `kernel_admission_rejected_total` (counter): rejections by `reason`
//! - `kernel_rate_limit_tracked_clients` (gauge): clients with a live window
//! - `kernel_csrf_tokens` (gauge): outstanding CSRF tokens
//! - `kernel_modules` (gauge): modules by `status` (total, ready, error)
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::modules::Summary;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request() {
    ::metrics::counter!("kernel_requests_total").increment(1);
}

pub fn record_rejection(reason: &'static str) {
    ::metrics::counter!("kernel_admission_rejected_total", "reason" => reason).increment(1);
}

pub fn record_store_sizes(tracked_clients: usize, csrf_tokens: usize) {
    ::metrics::gauge!("kernel_rate_limit_tracked_clients").set(tracked_clients as f64);
    ::metrics::gauge!("kernel_csrf_tokens").set(csrf_tokens as f64);
}

pub fn record_module_summary(summary: &Summary) {
    ::metrics::gauge!("kernel_modules", "status" => "total").set(summary.total as f64);
    ::metrics::gauge!("kernel_modules", "status" => "ready").set(summary.ready as f64);
    ::metrics::gauge!("kernel_modules", "status" => "error").set(summary.errors as f64);
}
