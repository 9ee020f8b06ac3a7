//! # Hub Telemetry
//!
//! Logging, metrics and traffic metering for the hub.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hub_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `XO_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `XO_JSON_LOGS` | `false` | JSON formatted logs |
//! | `XO_CONSOLE_OUTPUT` | `true` | Write logs to the console |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;
pub mod metrics;
mod traffic;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, BYTES_RECEIVED, BYTES_SENT, COMPONENTS_CREATED,
    COMPONENTS_DELETED, LINKS_ACTIVE, MODULES_CONNECTED, PACKETS_RECEIVED, PACKETS_SENT,
    RECONCILIATIONS, TRAFFIC_BPS,
};
pub use traffic::{TrafficMeter, KF};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    Metrics(String),
}

/// Register metrics and install the log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
