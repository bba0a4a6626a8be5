//! Prometheus metrics for the odds pipeline.
//!
//! This module provides:
//! - Counters for order updates, anomalies, snapshot changes and checks
//! - Latency histograms for order fetches and event evaluation
//! - The Prometheus recorder rendered by the HTTP API

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Order fetch latency metric name.
pub const METRIC_ORDER_FETCH_LATENCY: &str = "order_fetch_latency_ms";
/// Event evaluation latency metric name.
pub const METRIC_EVALUATION_LATENCY: &str = "event_evaluation_latency_ms";
/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Order set updates counter metric name.
pub const METRIC_ORDER_UPDATES: &str = "order_updates_total";
/// Snapshot changes counter metric name.
pub const METRIC_SNAPSHOT_CHANGES: &str = "snapshot_changes_total";
/// Malformed orders counter metric name.
pub const METRIC_ANOMALIES: &str = "order_anomalies_total";
/// Arbitrage checks counter metric name.
pub const METRIC_ARBITRAGE_CHECKS: &str = "arbitrage_checks_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Failed HTTP requests counter metric name.
pub const METRIC_HTTP_ERRORS: &str = "http_errors_total";

/// Register descriptions for every metric.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_ORDER_FETCH_LATENCY,
        "Order fetch latency in milliseconds"
    );
    describe_histogram!(
        METRIC_EVALUATION_LATENCY,
        "Time to evaluate one event's combinations in milliseconds"
    );
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );

    describe_counter!(METRIC_ORDER_UPDATES, "Total number of order set updates applied");
    describe_counter!(
        METRIC_SNAPSHOT_CHANGES,
        "Total number of best-odds snapshots that changed"
    );
    describe_counter!(METRIC_ANOMALIES, "Total number of malformed orders excluded");
    describe_counter!(METRIC_ARBITRAGE_CHECKS, "Total number of event evaluations");
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of arbitrage opportunities detected"
    );
    describe_counter!(METRIC_HTTP_ERRORS, "Total number of failed HTTP requests");

    debug!("Metrics initialized");
}

/// Install the Prometheus recorder and describe every metric.
///
/// Only one recorder can be installed per process.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
}

/// Increment order updates counter.
pub fn inc_order_updates() {
    counter!(METRIC_ORDER_UPDATES).increment(1);
}

/// Increment snapshot changes counter.
pub fn inc_snapshot_changes() {
    counter!(METRIC_SNAPSHOT_CHANGES).increment(1);
}

/// Add excluded malformed orders.
pub fn add_anomalies(count: usize) {
    counter!(METRIC_ANOMALIES).increment(count as u64);
}

/// Increment arbitrage checks counter.
pub fn inc_arbitrage_checks() {
    counter!(METRIC_ARBITRAGE_CHECKS).increment(1);
}

/// Add detected opportunities.
pub fn add_opportunities_detected(count: usize) {
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(count as u64);
}

/// Increment failed HTTP requests counter.
pub fn inc_http_errors(endpoint: &str) {
    counter!(METRIC_HTTP_ERRORS, "endpoint" => endpoint.to_string()).increment(1);
}

/// Records the elapsed milliseconds into a histogram when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Start timing into `metric_name`.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Milliseconds since the timer started.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for an order fetch.
pub fn timer_order_fetch() -> LatencyTimer {
    LatencyTimer::new(METRIC_ORDER_FETCH_LATENCY)
}

/// Create a latency timer for event evaluation.
pub fn timer_evaluation() -> LatencyTimer {
    LatencyTimer::new(METRIC_EVALUATION_LATENCY)
}
