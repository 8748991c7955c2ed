// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the tenant reconciler.
//!
//! All metrics use the namespace prefix `aws_operator_giantswarm_io_`
//! (prometheus-safe version of "aws-operator.giantswarm.io").
//!
//! # Metrics Categories
//!
//! - **Pass Metrics** - Outcome and duration of whole reconciliation passes
//! - **Step Metrics** - Outcome and duration of every pipeline step, recorded by
//!   the metrics decorator
//! - **Retry Metrics** - Attempts made by the retry decorator
//! - **Cache Metrics** - Hits and misses of the discovery caches
//! - **Error Metrics** - Errors by step and error kind
//!
//! # Example
//!
//! ```rust,no_run
//! use tenant_reconciler::metrics::record_step_success;
//!
//! record_step_success("tcvpc", "create", std::time::Duration::from_millis(120));
//! ```

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

use crate::constants::METRICS_SERVER_PATH;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all reconciler metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "aws_operator_giantswarm_io";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Pass Metrics
// ============================================================================

/// Total number of reconciliation passes by pass kind and outcome
///
/// Labels:
/// - `pass`: `create` or `delete`
/// - `outcome`: `completed`, `cancelled`, `failed`
pub static PASSES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_passes_total"),
        "Total number of reconciliation passes by kind and outcome",
    );
    let counter = CounterVec::new(opts, &["pass", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliation passes in seconds
///
/// Labels:
/// - `pass`: `create` or `delete`
pub static PASS_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_pass_duration_seconds"),
        "Duration of reconciliation passes in seconds by kind",
    )
    .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]);
    let histogram = HistogramVec::new(opts, &["pass"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Step Metrics
// ============================================================================

/// Total number of step invocations by step, pass kind, and outcome
///
/// Labels:
/// - `step`: Step name (e.g., `tcvpc`, `tcaz`)
/// - `pass`: `create` or `delete`
/// - `outcome`: `success`, `cancelled`, or `error`
pub static STEP_INVOCATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_step_invocations_total"),
        "Total number of pipeline step invocations by step, pass kind, and outcome",
    );
    let counter = CounterVec::new(opts, &["step", "pass", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of step invocations in seconds
///
/// Labels:
/// - `step`: Step name
/// - `pass`: `create` or `delete`
pub static STEP_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_step_duration_seconds"),
        "Duration of pipeline step invocations in seconds",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["step", "pass"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Retry Metrics
// ============================================================================

/// Total number of retried step attempts
///
/// Labels:
/// - `step`: Step name
pub static STEP_RETRIES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_step_retries_total"),
        "Total number of retried pipeline step attempts",
    );
    let counter = CounterVec::new(opts, &["step"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Cache Metrics
// ============================================================================

/// Total number of discovery cache lookups
///
/// Labels:
/// - `cache`: Cache name (e.g., `route_tables`, `hosted_zones`)
/// - `result`: `hit` or `miss`
pub static CACHE_LOOKUPS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_cache_lookups_total"),
        "Total number of discovery cache lookups by cache and result",
    );
    let counter = CounterVec::new(opts, &["cache", "result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by step and error kind
///
/// Labels:
/// - `step`: Step name, or `controller` for errors outside a pipeline
/// - `error_type`: Error kind (see `ReconcileError::metric_label`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by step and error kind",
    );
    let counter = CounterVec::new(opts, &["step", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record the outcome of a reconciliation pass
///
/// # Arguments
/// * `pass` - `create` or `delete`
/// * `outcome` - `completed`, `cancelled`, or `failed`
/// * `duration` - Wall-clock duration of the pass
pub fn record_pass(pass: &str, outcome: &str, duration: Duration) {
    PASSES_TOTAL.with_label_values(&[pass, outcome]).inc();
    PASS_DURATION_SECONDS
        .with_label_values(&[pass])
        .observe(duration.as_secs_f64());
}

/// Record a successful step invocation
pub fn record_step_success(step: &str, pass: &str, duration: Duration) {
    STEP_INVOCATIONS_TOTAL
        .with_label_values(&[step, pass, "success"])
        .inc();
    STEP_DURATION_SECONDS
        .with_label_values(&[step, pass])
        .observe(duration.as_secs_f64());
}

/// Record a step invocation that cancelled the pass
pub fn record_step_cancelled(step: &str, pass: &str, duration: Duration) {
    STEP_INVOCATIONS_TOTAL
        .with_label_values(&[step, pass, "cancelled"])
        .inc();
    STEP_DURATION_SECONDS
        .with_label_values(&[step, pass])
        .observe(duration.as_secs_f64());
}

/// Record a failed step invocation
///
/// # Arguments
/// * `step` - Step name
/// * `pass` - `create` or `delete`
/// * `error_type` - Error kind label
/// * `duration` - Duration of the invocation before failure
pub fn record_step_error(step: &str, pass: &str, error_type: &str, duration: Duration) {
    STEP_INVOCATIONS_TOTAL
        .with_label_values(&[step, pass, "error"])
        .inc();
    STEP_DURATION_SECONDS
        .with_label_values(&[step, pass])
        .observe(duration.as_secs_f64());
    record_error(step, error_type);
}

/// Record one retried attempt of a step
pub fn record_step_retry(step: &str) {
    STEP_RETRIES_TOTAL.with_label_values(&[step]).inc();
}

/// Record a discovery cache lookup
pub fn record_cache_lookup(cache: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    CACHE_LOOKUPS_TOTAL.with_label_values(&[cache, result]).inc();
}

/// Record an error
///
/// # Arguments
/// * `step` - Step name where the error occurred
/// * `error_type` - Error kind label
pub fn record_error(step: &str, error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[step, error_type]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to gather metrics: {e}"),
        ),
    }
}

/// HTTP router exposing the metrics endpoint.
pub fn router() -> Router {
    Router::new().route(METRICS_SERVER_PATH, get(metrics_handler))
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
