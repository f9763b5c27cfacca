// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Hetzner cluster operator.
//!
//! All metrics share the namespace prefix `caph` and are registered in
//! [`METRICS_REGISTRY`], which is served on `/metrics`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Reconciliation outcomes, durations and requeues
//! - **Hetzner Cloud Metrics** - API calls by operation and outcome, rate-limit deferrals
//! - **Resource Lifecycle Metrics** - Remote resources created, updated and deleted
//!
//! # Example
//!
//! ```rust,no_run
//! use hetzner_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("HetznerCluster", std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics
const METRICS_NAMESPACE: &str = "caph";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register_counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let counter = CounterVec::new(Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help), labels)
        .expect("metric definition is valid");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (`HetznerCluster`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "reconciliations_total",
        "Total number of reconciliations by resource type and status",
        &["resource_type", "status"],
    )
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram =
        HistogramVec::new(opts, &["resource_type"]).expect("metric definition is valid");
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric registered once");
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Condition reason that caused the requeue
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "requeues_total",
        "Total number of requeue operations by resource type and reason",
        &["resource_type", "reason"],
    )
});

// ============================================================================
// Hetzner Cloud Metrics
// ============================================================================

/// Hetzner Cloud API calls
///
/// Labels:
/// - `operation`: Client method (`list_load_balancers`, `create_placement_group`, ...)
/// - `outcome`: `answered`, `rate_limited` or `unreachable`
pub static HCLOUD_API_CALLS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "hcloud_api_calls_total",
        "Hetzner Cloud API calls by operation and outcome",
        &["operation", "outcome"],
    )
});

/// Passes that skipped all API calls because the rate-limit window was still open
pub static RATE_LIMIT_DEFERRALS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "rate_limit_deferrals_total",
        "Reconciliations deferred by the rate-limit governor",
        &["resource_type"],
    )
});

// ============================================================================
// Resource Lifecycle Metrics
// ============================================================================

/// Remote resources created, by kind (`load_balancer`, `placement_group`, `network`)
pub static RESOURCES_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "resources_created_total",
        "Total number of Hetzner Cloud resources created by kind",
        &["resource_type"],
    )
});

/// Remote resources updated in place
pub static RESOURCES_UPDATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "resources_updated_total",
        "Total number of Hetzner Cloud resources updated by kind",
        &["resource_type"],
    )
});

/// Remote resources deleted
pub static RESOURCES_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "resources_deleted_total",
        "Total number of Hetzner Cloud resources deleted by kind",
        &["resource_type"],
    )
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a requeue and the reason behind it
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record one Hetzner Cloud API call
pub fn record_hcloud_call(operation: &str, outcome: &str) {
    HCLOUD_API_CALLS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Record a pass deferred by the rate-limit governor
pub fn record_rate_limit_deferral(resource_type: &str) {
    RATE_LIMIT_DEFERRALS_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

pub fn record_resource_created(resource_type: &str) {
    RESOURCES_CREATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

pub fn record_resource_updated(resource_type: &str) {
    RESOURCES_UPDATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

pub fn record_resource_deleted(resource_type: &str) {
    RESOURCES_DELETED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
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
