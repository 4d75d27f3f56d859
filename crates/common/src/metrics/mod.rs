//! Metrics and observability utilities
//!
//! Prometheus metrics with SLO-aligned histograms and a shared naming prefix.

use crate::catalog::RefreshSummary;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Colonia metrics
pub const METRICS_PREFIX: &str = "colonia";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms - P50 target
    0.100, // 100ms
    0.250, // 250ms - P99 target
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
];

/// Buckets for catalog refreshes (network fetch plus one large transaction)
pub const REFRESH_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

fn name(suffix: &str) -> String {
    format!("{}_{}", METRICS_PREFIX, suffix)
}

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(name("requests_total"), Unit::Count, "Total number of HTTP requests");
    describe_histogram!(
        name("request_duration_seconds"),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        name("catalog_refreshes_total"),
        Unit::Count,
        "Completed requirement catalog refreshes"
    );
    describe_counter!(
        name("catalog_rows_total"),
        Unit::Count,
        "Sheet rows processed by catalog refreshes, by outcome"
    );
    describe_histogram!(
        name("catalog_refresh_duration_seconds"),
        Unit::Seconds,
        "Catalog refresh latency in seconds"
    );

    describe_counter!(
        name("progress_updates_total"),
        Unit::Count,
        "Accepted per-commodity progress updates"
    );

    describe_gauge!(name("live_observers"), Unit::Count, "Connected live update observers");
    describe_counter!(
        name("live_messages_total"),
        Unit::Count,
        "Live update deliveries, by status"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            name("requests_total"),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            name("request_duration_seconds"),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

pub fn record_catalog_refresh(duration_secs: f64, summary: &RefreshSummary) {
    counter!(name("catalog_refreshes_total")).increment(1);
    histogram!(name("catalog_refresh_duration_seconds")).record(duration_secs);

    for (outcome, count) in [
        ("inserted", summary.inserted),
        ("updated", summary.updated),
        ("unchanged", summary.unchanged),
        ("skipped", summary.skipped),
    ] {
        counter!(name("catalog_rows_total"), "outcome" => outcome).increment(count as u64);
    }
}

pub fn record_progress_update() {
    counter!(name("progress_updates_total")).increment(1);
}

/// Record the outcome of one broadcast
pub fn record_broadcast(delivered: usize, dropped: usize) {
    counter!(name("live_messages_total"), "status" => "delivered").increment(delivered as u64);
    if dropped > 0 {
        counter!(name("live_messages_total"), "status" => "dropped").increment(dropped as u64);
    }
}

pub fn set_observers(count: usize) {
    gauge!(name("live_observers")).set(count as f64);
}
