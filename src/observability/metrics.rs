//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mapper_lookups_total` (counter): lookups by outcome
//!   (handler, redirect, paused, not_found, invalid)
//! - `mapper_lookup_duration_seconds` (histogram): time spent in the mapper
//! - `http_requests_total` (counter): responses by status and match type
//! - `deployment_events_total` (counter): events by kind and outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels are static strings; no per-host or per-path cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_lookup(outcome: &'static str, start: Instant) {
    counter!("mapper_lookups_total", "outcome" => outcome).increment(1);
    histogram!("mapper_lookup_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_request(status: u16, match_type: &'static str) {
    counter!(
        "http_requests_total",
        "status" => status.to_string(),
        "match_type" => match_type
    )
    .increment(1);
}

pub fn record_deployment_event(kind: &'static str, outcome: &'static str) {
    counter!("deployment_events_total", "kind" => kind, "outcome" => outcome).increment(1);
}
