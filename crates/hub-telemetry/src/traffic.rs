//! Smoothed transport throughput.
//!
//! Byte counters are sampled on a fixed tick and folded into an exponential
//! moving average: `bps = bps * KF + instant * (1 - KF)`.

use crate::metrics::{self, BYTES_RECEIVED, BYTES_SENT, PACKETS_RECEIVED, PACKETS_SENT};
use std::time::Instant;

/// Smoothing factor of the moving average.
pub const KF: f64 = 0.95;

#[derive(Debug, Default, Clone)]
pub struct TrafficMeter {
    bytes_received: u64,
    bytes_sent: u64,
    packets_received: u64,
    packets_sent: u64,
    received_at_sample: u64,
    sent_at_sample: u64,
    last_sample: Option<Instant>,
    rx_bps: f64,
    tx_bps: f64,
}

impl TrafficMeter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
        self.packets_received += 1;
        BYTES_RECEIVED.inc_by(bytes as u64);
        PACKETS_RECEIVED.inc();
    }

    pub fn record_sent(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
        self.packets_sent += 1;
        BYTES_SENT.inc_by(bytes as u64);
        PACKETS_SENT.inc();
    }

    /// Fold the bytes seen since the previous sample into the averages.
    ///
    /// The first call only starts the clock.
    pub fn sample(&mut self, now: Instant) {
        let Some(last) = self.last_sample.replace(now) else {
            self.received_at_sample = self.bytes_received;
            self.sent_at_sample = self.bytes_sent;
            return;
        };
        let dt = now.saturating_duration_since(last).as_secs_f64();
        if dt <= 0.0 {
            return;
        }

        let rx = (self.bytes_received - self.received_at_sample) as f64 / dt;
        let tx = (self.bytes_sent - self.sent_at_sample) as f64 / dt;
        self.rx_bps = self.rx_bps * KF + rx * (1.0 - KF);
        self.tx_bps = self.tx_bps * KF + tx * (1.0 - KF);
        self.received_at_sample = self.bytes_received;
        self.sent_at_sample = self.bytes_sent;

        metrics::record_traffic(self.rx_bps, self.tx_bps);
    }

    #[must_use]
    pub fn receive_bps(&self) -> f64 {
        self.rx_bps
    }

    #[must_use]
    pub fn transmit_bps(&self) -> f64 {
        self.tx_bps
    }

    #[must_use]
    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    #[must_use]
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }
}
