//! Prometheus metrics for the bridge.
//!
//! All metrics follow the naming convention: `wb_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // DISPATCHER METRICS
    // =========================================================================

    /// Requests accepted by the dispatcher
    pub static ref REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("wb_dispatcher_requests_total", "Requests accepted by the dispatcher"),
        &["method", "category"]
    ).expect("metric creation failed");

    /// Request outcomes: ok or an error kind
    pub static ref REQUEST_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("wb_dispatcher_request_outcomes_total", "Request outcomes"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Duplicate request ids dropped
    pub static ref DUPLICATE_REQUESTS: Counter = Counter::new(
        "wb_dispatcher_duplicate_requests_total",
        "Inbound requests dropped as duplicates"
    ).expect("metric creation failed");

    /// Time from receipt to answer
    pub static ref REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "wb_dispatcher_request_duration_seconds",
            "Time from receipt to answer"
        ).buckets(exponential_buckets(0.0005, 2.0, 18).expect("bucket creation failed")),
        &["category"]
    ).expect("metric creation failed");

    // =========================================================================
    // APPROVAL METRICS
    // =========================================================================

    /// Approval tickets by outcome
    pub static ref APPROVALS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("wb_approval_tickets_total", "Approval tickets by outcome"),
        &["outcome"]  // approved/rejected/timed_out/coalesced/surface_failed/queue_full
    ).expect("metric creation failed");

    /// Tickets awaiting a decision
    pub static ref PENDING_APPROVALS: Gauge = Gauge::new(
        "wb_approval_tickets_pending",
        "Approval tickets awaiting a decision"
    ).expect("metric creation failed");

    // =========================================================================
    // CONNECTION METRICS
    // =========================================================================

    pub static ref PROBE_FAILURES: Counter = Counter::new(
        "wb_connection_probe_failures_total",
        "Liveness probes that failed or timed out"
    ).expect("metric creation failed");

    pub static ref RECONNECT_ATTEMPTS: Counter = Counter::new(
        "wb_connection_reconnect_attempts_total",
        "Reconnection attempts"
    ).expect("metric creation failed");

    pub static ref RECONNECTIONS: Counter = Counter::new(
        "wb_connection_reconnections_total",
        "Successful reconnections"
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT METRICS
    // =========================================================================

    /// Events broadcast to relays
    pub static ref EVENTS_BROADCAST: CounterVec = CounterVec::new(
        Opts::new("wb_events_broadcast_total", "Provider events broadcast"),
        &["event"]
    ).expect("metric creation failed");

    /// Relays attached to the backend
    pub static ref RELAYS_ATTACHED: Gauge = Gauge::new(
        "wb_relays_attached",
        "Relay connections attached to the backend"
    ).expect("metric creation failed");
}

/// Handle for the registered metrics.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Dispatcher
        Box::new(REQUESTS_TOTAL.clone()),
        Box::new(REQUEST_OUTCOMES.clone()),
        Box::new(DUPLICATE_REQUESTS.clone()),
        Box::new(REQUEST_DURATION.clone()),
        // Approval
        Box::new(APPROVALS_TOTAL.clone()),
        Box::new(PENDING_APPROVALS.clone()),
        // Connection
        Box::new(PROBE_FAILURES.clone()),
        Box::new(RECONNECT_ATTEMPTS.clone()),
        Box::new(RECONNECTIONS.clone()),
        // Events
        Box::new(EVENTS_BROADCAST.clone()),
        Box::new(RELAYS_ATTACHED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
