//! # Adapter Implementations
//!
//! Concrete implementations of the hub's outbound ports, plus the TCP
//! transport that feeds module traffic into the runtime.
//!
//! ## Hexagonal Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     OUTER LAYER (Adapters)                          │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │  TokioTimers, ConnectionRegistry, FsConfigCache,              │  │
//! │  │  StdProcessLauncher, serve()                                  │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │                              ↑ implements ↑                         │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                    MIDDLE LAYER (Ports)                        │  │
//! │  │  TimerService, FrameSink, ConfigCache, ProcessLauncher        │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │                              ↑ uses ↑                               │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                    INNER LAYER (Hub)                           │  │
//! │  │  Reconciliation, links, module sessions - no I/O, no async    │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config_cache;
pub mod process;
pub mod timers;
pub mod transport;

pub use config_cache::*;
pub use process::*;
pub use timers::*;
pub use transport::*;
