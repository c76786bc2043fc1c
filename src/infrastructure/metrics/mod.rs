//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Active WebSocket connection gauges
//! - Presence transitions, story posts, relayed signals
//! - Deliveries received from the cross-process bus

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "realtime_server";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Active WebSocket connections gauge
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new(
            "websocket_connections_active",
            "Number of active WebSocket connections",
        )
        .namespace(NAMESPACE),
        &["state"], // "connected", "authenticated"
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Presence transitions by kind
pub static PRESENCE_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("presence_transitions_total", "Presence online/offline transitions")
            .namespace(NAMESPACE),
        &["transition"], // "online", "offline"
    )
    .expect("Failed to create PRESENCE_TRANSITIONS_TOTAL metric")
});

/// Story posts by outcome (success or error code)
pub static STORIES_POSTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stories_posted_total", "Story posts by outcome").namespace(NAMESPACE),
        &["outcome"],
    )
    .expect("Failed to create STORIES_POSTED_TOTAL metric")
});

/// Call signals by kind and outcome
pub static SIGNALS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("call_signals_total", "Call signaling messages by kind and outcome")
            .namespace(NAMESPACE),
        &["kind", "outcome"], // outcome: "relayed", "dropped"
    )
    .expect("Failed to create SIGNALS_TOTAL metric")
});

/// Deliveries received from the bus
pub static BUS_DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bus_deliveries_total", "Deliveries received from the delivery bus")
            .namespace(NAMESPACE),
        &["target"], // "connections", "all"
    )
    .expect("Failed to create BUS_DELIVERIES_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(PRESENCE_TRANSITIONS_TOTAL.clone()))
        .expect("Failed to register PRESENCE_TRANSITIONS_TOTAL");
    registry
        .register(Box::new(STORIES_POSTED_TOTAL.clone()))
        .expect("Failed to register STORIES_POSTED_TOTAL");
    registry
        .register(Box::new(SIGNALS_TOTAL.clone()))
        .expect("Failed to register SIGNALS_TOTAL");
    registry
        .register(Box::new(BUS_DELIVERIES_TOTAL.clone()))
        .expect("Failed to register BUS_DELIVERIES_TOTAL");
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

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to update WebSocket connection count
pub fn set_websocket_connections(connected: i64, authenticated: i64) {
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&["connected"])
        .set(connected as f64);
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&["authenticated"])
        .set(authenticated as f64);
}

pub fn record_presence_transition(online: bool) {
    let label = if online { "online" } else { "offline" };
    PRESENCE_TRANSITIONS_TOTAL.with_label_values(&[label]).inc();
}

pub fn record_story_post(outcome: &str) {
    STORIES_POSTED_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_signal(kind: &str, relayed: bool) {
    let outcome = if relayed { "relayed" } else { "dropped" };
    SIGNALS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn record_bus_delivery(broadcast: bool) {
    let target = if broadcast { "all" } else { "connections" };
    BUS_DELIVERIES_TOTAL.with_label_values(&[target]).inc();
}
