//! # Integration Scenarios
//!
//! The hub wired to the recording doubles of `hub_runtime::test_utils`,
//! driven with frames built by a `SimulatedModule`, and the full runtime
//! driven over a real TCP socket.

#[cfg(test)]
mod harness;
pub mod scenarios;
pub mod transport;
