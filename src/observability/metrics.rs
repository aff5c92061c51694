//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (requests, latency, config refreshes, preview lookups)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by routing decision and status
//! - `edge_request_duration_seconds` (histogram): end-to-end latency
//! - `edge_config_refresh_total` (counter): snapshot fetches by outcome
//! - `edge_config_refresh_duration_seconds` (histogram): snapshot fetch latency
//! - `edge_config_version_info` (gauge): 1 for the live snapshot version
//! - `edge_preview_lookups_total` (counter): registry lookups by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a no-op, so tests need no setup
//! - Histogram buckets tuned for edge latencies (single-digit ms to seconds)

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Instant;

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Version label currently reported as live.
static LIVE_VERSION: Mutex<Option<String>> = Mutex::new(None);

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            LATENCY_BUCKETS,
        );

    let builder = match builder {
        Ok(builder) => builder,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid histogram buckets, using exporter defaults");
            PrometheusBuilder::new().with_http_listener(addr)
        }
    };

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one routed request.
pub fn record_request(method: &str, decision: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "edge_requests_total",
        "method" => method.to_string(),
        "decision" => decision,
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!("edge_request_duration_seconds", "decision" => decision)
        .record(start.elapsed().as_secs_f64());
}

/// Record a snapshot fetch; `outcome` is `success` or `failure`.
pub fn record_config_refresh(outcome: &'static str, start: Instant) {
    metrics::counter!("edge_config_refresh_total", "outcome" => outcome).increment(1);
    metrics::histogram!("edge_config_refresh_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Mark `version` as the live snapshot and clear the previous series.
pub fn record_config_version(version: &str) {
    let mut live = match LIVE_VERSION.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if live.as_deref() == Some(version) {
        return;
    }
    if let Some(previous) = live.take() {
        metrics::gauge!("edge_config_version_info", "version" => previous).set(0.0);
    }
    metrics::gauge!("edge_config_version_info", "version" => version.to_string()).set(1.0);
    *live = Some(version.to_string());
}

/// Record a preview registry lookup; `outcome` is `hit`, `miss`, `cached` or `error`.
pub fn record_preview_lookup(outcome: &'static str) {
    metrics::counter!("edge_preview_lookups_total", "outcome" => outcome).increment(1);
}
