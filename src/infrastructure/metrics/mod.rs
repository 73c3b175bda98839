//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Messages appended and failed appends
//! - Presence transitions by resulting status
//! - Active gateway sessions
//! - Hub resyncs forced on lagging subscribers

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Messages durably appended to the log
pub static MESSAGES_APPENDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("messages_appended_total", "Total number of messages appended")
            .namespace("chat_presence"),
    )
    .expect("Failed to create MESSAGES_APPENDED_TOTAL metric")
});

/// Appends rejected by the storage backend
pub static APPEND_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("append_failures_total", "Total number of failed message appends")
            .namespace("chat_presence"),
    )
    .expect("Failed to create APPEND_FAILURES_TOTAL metric")
});

/// Presence status transitions
pub static PRESENCE_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("presence_transitions_total", "Presence transitions by resulting status")
            .namespace("chat_presence"),
        &["status", "cause"], // status: "online" | "offline"; cause: "heartbeat" | "expiry" | "disconnect"
    )
    .expect("Failed to create PRESENCE_TRANSITIONS_TOTAL metric")
});

/// Active gateway sessions
pub static GATEWAY_SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("gateway_sessions_active", "Number of connected gateway sessions")
            .namespace("chat_presence"),
    )
    .expect("Failed to create GATEWAY_SESSIONS_ACTIVE metric")
});

/// Resyncs forced on subscribers whose buffer overflowed
pub static HUB_RESYNCS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("hub_resyncs_total", "Total number of subscriber resyncs")
            .namespace("chat_presence"),
    )
    .expect("Failed to create HUB_RESYNCS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(MESSAGES_APPENDED_TOTAL.clone()))
        .expect("Failed to register MESSAGES_APPENDED_TOTAL");
    registry
        .register(Box::new(APPEND_FAILURES_TOTAL.clone()))
        .expect("Failed to register APPEND_FAILURES_TOTAL");
    registry
        .register(Box::new(PRESENCE_TRANSITIONS_TOTAL.clone()))
        .expect("Failed to register PRESENCE_TRANSITIONS_TOTAL");
    registry
        .register(Box::new(GATEWAY_SESSIONS_ACTIVE.clone()))
        .expect("Failed to register GATEWAY_SESSIONS_ACTIVE");
    registry
        .register(Box::new(HUB_RESYNCS_TOTAL.clone()))
        .expect("Failed to register HUB_RESYNCS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record a presence transition
pub fn record_presence_transition(status: &str, cause: &str) {
    PRESENCE_TRANSITIONS_TOTAL
        .with_label_values(&[status, cause])
        .inc();
}
