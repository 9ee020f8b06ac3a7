//! Prometheus metrics for the hub.
//!
//! All metrics follow the naming convention: `xo_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Encoder, GaugeVec, IntCounter, IntGauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // TRANSPORT
    // =========================================================================

    pub static ref PACKETS_RECEIVED: IntCounter = IntCounter::new(
        "xo_packets_received_total",
        "Packets received from modules"
    ).expect("metric creation failed");

    pub static ref PACKETS_SENT: IntCounter = IntCounter::new(
        "xo_packets_sent_total",
        "Packets sent to modules"
    ).expect("metric creation failed");

    pub static ref BYTES_RECEIVED: IntCounter = IntCounter::new(
        "xo_bytes_received_total",
        "Bytes received from modules"
    ).expect("metric creation failed");

    pub static ref BYTES_SENT: IntCounter = IntCounter::new(
        "xo_bytes_sent_total",
        "Bytes sent to modules"
    ).expect("metric creation failed");

    /// Smoothed throughput in bytes per second
    pub static ref TRAFFIC_BPS: GaugeVec = GaugeVec::new(
        Opts::new("xo_traffic_bps", "Smoothed transport throughput in bytes per second"),
        &["direction"]  // direction: rx/tx
    ).expect("metric creation failed");

    // =========================================================================
    // RECONCILIATION
    // =========================================================================

    pub static ref RECONCILIATIONS: IntCounter = IntCounter::new(
        "xo_reconciliations_total",
        "Scheme reconciliation passes"
    ).expect("metric creation failed");

    pub static ref COMPONENTS_CREATED: IntCounter = IntCounter::new(
        "xo_components_created_total",
        "Create-component requests issued by reconciliation"
    ).expect("metric creation failed");

    pub static ref COMPONENTS_DELETED: IntCounter = IntCounter::new(
        "xo_components_deleted_total",
        "Delete-component requests issued by reconciliation"
    ).expect("metric creation failed");

    pub static ref LINKS_ACTIVE: IntGauge = IntGauge::new(
        "xo_links_active",
        "Object links currently established"
    ).expect("metric creation failed");

    pub static ref MODULES_CONNECTED: IntGauge = IntGauge::new(
        "xo_modules_connected",
        "Modules with a live transport"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Registering twice reports an error; callers that may race (tests) can
/// ignore it.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Transport
        Box::new(PACKETS_RECEIVED.clone()),
        Box::new(PACKETS_SENT.clone()),
        Box::new(BYTES_RECEIVED.clone()),
        Box::new(BYTES_SENT.clone()),
        Box::new(TRAFFIC_BPS.clone()),
        // Reconciliation
        Box::new(RECONCILIATIONS.clone()),
        Box::new(COMPONENTS_CREATED.clone()),
        Box::new(COMPONENTS_DELETED.clone()),
        Box::new(LINKS_ACTIVE.clone()),
        Box::new(MODULES_CONNECTED.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    }
    Ok(())
}

/// Publish the latest smoothed throughput.
pub fn record_traffic(rx_bps: f64, tx_bps: f64) {
    TRAFFIC_BPS.with_label_values(&["rx"]).set(rx_bps);
    TRAFFIC_BPS.with_label_values(&["tx"]).set(tx_bps);
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}
