//! # Shared Bus - Hub Event Bus
//!
//! Broadcasts hub lifecycle notifications to any number of observers.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐   subscribe()   ┌──────────┐
//! │     Hub      │ ────────────▶ │  Event Bus   │ ──────────────▶ │ Observer │
//! └──────────────┘               └──────────────┘                 └──────────┘
//! ```
//!
//! Publishing is synchronous and never waits for observers. A slow observer
//! lags and loses the oldest events rather than stalling the hub.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, HubEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
