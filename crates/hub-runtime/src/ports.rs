//! # Outbound Ports (Driven Ports)
//!
//! Everything the hub needs from the outside world. The hub itself does no
//! I/O; it calls these traits from its single control flow.
//!
//! | Port | Production | Testing |
//! |------|------------|---------|
//! | [`TimerService`] | `adapters::TokioTimers` | `test_utils::RecordingTimers` |
//! | [`FrameSink`] | `adapters::ConnectionRegistry` | `test_utils::RecordingFrames` |
//! | [`ConfigCache`] | `adapters::FsConfigCache` | `test_utils::InMemoryConfigCache` |
//! | [`ProcessLauncher`] | `adapters::StdProcessLauncher` | `test_utils::RecordingLauncher` |

use crate::loader::LoaderError;
use onb_protocol::ObjectAddr;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Identity of a periodic timer. Arming an armed key replaces its period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKey {
    /// Live-component enumeration of one module.
    InstancePoll(String),
    /// Value poll of a rate-limited publisher.
    PublisherPoll(ObjectAddr),
    /// Local auto-request of an output on a bus that cannot push.
    AutoRequest(ObjectAddr),
    /// Child-process exit check.
    ProcessReap,
    /// Traffic meter sample.
    TrafficSample,
}

/// Periodic timers; a fired timer comes back as a runtime command.
pub trait TimerService: Send {
    fn arm(&mut self, key: TimerKey, period: Duration);

    fn cancel(&mut self, key: &TimerKey);
}

/// Delivery of encoded frames to a connected module.
pub trait FrameSink: Send {
    /// Queue one frame. Returns `false` if the module has no transport.
    fn send(&mut self, module: &str, frame: Vec<u8>) -> bool;
}

/// Per-class config files: `{module: {type: info}}`.
pub trait ConfigCache: Send {
    fn module_exists(&self, module: &str) -> bool;

    /// Write a class config unless one exists. Returns `true` if written.
    fn write_component(&mut self, module: &str, type_name: &str, info: &Json) -> Result<bool, LoaderError>;

    /// Store the module icon unless one exists.
    fn write_icon(&mut self, module: &str, icon: &[u8]) -> Result<bool, LoaderError>;

    fn remove_module(&mut self, module: &str) -> Result<(), LoaderError>;

    fn read_all(&self) -> Result<BTreeMap<String, BTreeMap<String, Json>>, LoaderError>;
}

/// A running module process.
pub trait ChildProcess: Send {
    fn id(&self) -> u32;

    /// Exit code if the process has finished (`-1` when killed by a signal).
    fn try_wait(&mut self) -> Result<Option<i32>, LoaderError>;

    /// Kill the process and block until it is gone.
    fn kill_and_wait(&mut self) -> Result<(), LoaderError>;
}

/// Spawns module processes.
pub trait ProcessLauncher: Send {
    fn spawn(
        &mut self,
        module: &str,
        program: &Path,
        args: &[String],
        working_dir: &Path,
    ) -> Result<Box<dyn ChildProcess>, LoaderError>;
}
