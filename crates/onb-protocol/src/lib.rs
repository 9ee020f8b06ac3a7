//! # ONB Protocol Stack
//!
//! Host side of the ONB object bus: the wire codec, the typed object model,
//! component and module proxies, and the engine that links one component's
//! outputs to another component's inputs.
//!
//! ## Layers
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ link::LinkEngine        publisher → subscriber edges     │
//! ├──────────────────────────────────────────────────────────┤
//! │ module::ModuleProxy     classes, components, lifecycle   │
//! ├──────────────────────────────────────────────────────────┤
//! │ component::ComponentProxy  negotiation, data, settings   │
//! ├──────────────────────────────────────────────────────────┤
//! │ domain                  Packet, Value, Object, metadata  │
//! └──────────────────────────────────────────────────────────┘
//!                ▲                         │
//!     receive_frame(&[u8])          PacketSink::drain()
//!                │                         ▼
//!            transport                 transport
//! ```
//!
//! The crate does no I/O. Inbound frames are handed to
//! [`ModuleProxy::receive_frame`]; outbound packets accumulate in the
//! module's [`PacketSink`] in emission order and the owner drains them onto
//! its transport.
//!
//! ## Wire Header
//!
//! | Byte | Field |
//! |------|-------|
//! | 0    | flags: bit0 `svc`, bit1 `local`, bit2 `classInfo` |
//! | 1-2  | component id (u16 LE) |
//! | 3    | object id |
//!
//! Multi-byte integers are little-endian throughout.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod component;
pub mod domain;
pub mod link;
pub mod module;
pub mod sink;

pub use component::{ChannelKind, ComponentEvent, ComponentProxy, ServiceInfo, Subscription};
pub use domain::{
    BusType, ComponentError, DecodeError, Header, LinkError, ModuleError, Object,
    ObjectDescription, ObjectFlags, Packet, PacketError, PublisherHandle, Value, ValueError,
    ValueType,
};
pub use link::{Edge, Forward, ForwardPolicy, LinkEngine, Linked, ObjectAddr, Trigger};
pub use module::{ModuleEvent, ModuleProxy};
pub use sink::PacketSink;
