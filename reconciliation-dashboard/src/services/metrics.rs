//! Prometheus metrics for the reconciliation dashboard.

use crate::gateway::GatewayError;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, CounterVec, Encoder,
    Histogram, HistogramVec, TextEncoder,
};

/// Counter for gateway requests by endpoint and outcome.
pub static GATEWAY_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashboard_gateway_requests_total",
        "Total number of gateway requests",
        &["endpoint", "outcome"]
    )
    .expect("Failed to register GATEWAY_REQUESTS")
});

/// Histogram for gateway request duration by endpoint.
pub static GATEWAY_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dashboard_gateway_request_duration_seconds",
        "Gateway request duration in seconds",
        &["endpoint"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("Failed to register GATEWAY_REQUEST_DURATION")
});

/// Counter for reconciliation runs by terminal phase.
pub static RECONCILIATION_RUNS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashboard_reconciliation_runs_total",
        "Total number of reconciliation runs",
        &["outcome"]
    )
    .expect("Failed to register RECONCILIATION_RUNS")
});

/// Histogram for how many result fetches a run needed.
pub static RESULT_FETCH_ATTEMPTS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "dashboard_result_fetch_attempts",
        "Result fetch attempts per reconciliation run",
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 8.0]
    )
    .expect("Failed to register RESULT_FETCH_ATTEMPTS")
});

/// Counter for failed upload-status polls.
pub static STATUS_POLL_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashboard_status_poll_failures_total",
        "Total number of failed upload-status polls",
        &["error_type"]
    )
    .expect("Failed to register STATUS_POLL_FAILURES")
});

/// Counter for failed deletes of previous results.
pub static CLEANUP_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashboard_cleanup_failures_total",
        "Total number of non-critical cleanup failures",
        &["error_type"]
    )
    .expect("Failed to register CLEANUP_FAILURES")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&GATEWAY_REQUESTS);
    Lazy::force(&GATEWAY_REQUEST_DURATION);
    Lazy::force(&RECONCILIATION_RUNS);
    Lazy::force(&RESULT_FETCH_ATTEMPTS);
    Lazy::force(&STATUS_POLL_FAILURES);
    Lazy::force(&CLEANUP_FAILURES);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record one gateway request and its duration.
pub fn record_gateway_request<T>(
    endpoint: &str,
    result: &Result<T, GatewayError>,
    duration_secs: f64,
) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    GATEWAY_REQUESTS
        .with_label_values(&[endpoint, outcome])
        .inc();
    GATEWAY_REQUEST_DURATION
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

/// Record a finished reconciliation run.
pub fn record_reconciliation_run(outcome: &str) {
    RECONCILIATION_RUNS.with_label_values(&[outcome]).inc();
}

pub fn record_result_fetch_attempts(attempts: u32) {
    RESULT_FETCH_ATTEMPTS.observe(f64::from(attempts));
}

pub fn record_status_poll_failure(error: &GatewayError) {
    STATUS_POLL_FAILURES
        .with_label_values(&[error.kind()])
        .inc();
}

pub fn record_cleanup_failure(error: &GatewayError) {
    CLEANUP_FAILURES.with_label_values(&[error.kind()]).inc();
}
