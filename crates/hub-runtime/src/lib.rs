//! # Hub Runtime Library
//!
//! The scheme-reconciliation hub, the module loader and the runtime that
//! drives them. The `xo-hub` binary (`main.rs`) wires these to TCP, tokio
//! timers and real processes; tests wire them to the doubles in
//! [`test_utils`].
//!
//! ## Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`hub`] | module sessions, reconciliation, links, scheme operations |
//! | [`loader`] | module discovery, start options, launch manifest, processes |
//! | [`ports`] | traits the hub drives the outside world through |
//! | [`adapters`] | tokio, TCP, file-system and process implementations |
//! | [`runtime`] | command loop owning the hub |
//! | [`config`] | folder layout and periods |

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::module_name_repetitions)]

pub mod adapters;
pub mod config;
pub mod hub;
pub mod loader;
pub mod ports;
pub mod runtime;
pub mod test_utils;

pub use config::{ConfigError, HubConfig};
pub use hub::{Hub, HubError, HubPorts, LiveComponent};
pub use loader::{Loader, LoaderError, StartType};
pub use runtime::{command_channel, HubCommand, HubRuntime};
