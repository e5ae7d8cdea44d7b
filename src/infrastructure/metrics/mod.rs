//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connection gauges (connected vs. identity-bound)
//! - Inbound relay event counts by event name and outcome
//! - Persisted message counts by kind (channel, dm)
//! - Fan-out delivery counts
//! - Silently dropped signaling events

use once_cell::sync::Lazy;
use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active WebSocket connections gauge
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new(
            "websocket_connections_active",
            "Number of active WebSocket connections",
        )
        .namespace("chat_relay"),
        &["state"], // "connected", "bound"
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Inbound event counter - tracks dispatched events by name and outcome
pub static RELAY_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("relay_events_total", "Total number of inbound relay events")
            .namespace("chat_relay"),
        &["event", "outcome"], // outcome: "ok", "error"
    )
    .expect("Failed to create RELAY_EVENTS_TOTAL metric")
});

/// Persisted message counter by kind
pub static MESSAGES_PERSISTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_persisted_total", "Messages written to the store")
            .namespace("chat_relay"),
        &["kind"], // "channel", "dm"
    )
    .expect("Failed to create MESSAGES_PERSISTED_TOTAL metric")
});

/// Fan-out delivery counter - one increment per receiving connection
pub static FANOUT_DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fanout_deliveries_total",
            "Per-connection deliveries performed by the fan-out engine",
        )
        .namespace("chat_relay"),
        &["kind"], // "channel", "dm"
    )
    .expect("Failed to create FANOUT_DELIVERIES_TOTAL metric")
});

/// Signaling events dropped because the target had no live connection
pub static SIGNALING_DROPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "signaling_dropped_total",
            "Signaling events dropped for offline targets",
        )
        .namespace("chat_relay"),
        &["event"],
    )
    .expect("Failed to create SIGNALING_DROPPED_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(RELAY_EVENTS_TOTAL.clone()))
        .expect("Failed to register RELAY_EVENTS_TOTAL");
    registry
        .register(Box::new(MESSAGES_PERSISTED_TOTAL.clone()))
        .expect("Failed to register MESSAGES_PERSISTED_TOTAL");
    registry
        .register(Box::new(FANOUT_DELIVERIES_TOTAL.clone()))
        .expect("Failed to register FANOUT_DELIVERIES_TOTAL");
    registry
        .register(Box::new(SIGNALING_DROPPED_TOTAL.clone()))
        .expect("Failed to register SIGNALING_DROPPED_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}

/// Helper to update WebSocket connection gauges
pub fn set_websocket_connections(connected: usize, bound: usize) {
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&["connected"])
        .set(connected as f64);
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&["bound"])
        .set(bound as f64);
}

/// Helper to record an inbound event and its outcome
pub fn record_event(event: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    RELAY_EVENTS_TOTAL.with_label_values(&[event, outcome]).inc();
}

/// Helper to record a persisted message
pub fn record_message_persisted(kind: &str) {
    MESSAGES_PERSISTED_TOTAL.with_label_values(&[kind]).inc();
}

/// Helper to record fan-out deliveries
pub fn record_deliveries(kind: &str, count: usize) {
    FANOUT_DELIVERIES_TOTAL
        .with_label_values(&[kind])
        .inc_by(count as u64);
}

/// Helper to record a dropped signaling event
pub fn record_signaling_drop(event: &str) {
    SIGNALING_DROPPED_TOTAL.with_label_values(&[event]).inc();
}
