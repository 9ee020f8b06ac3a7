//! # Module Proxy
//!
//! Host-side directory of one module: its live components, keyed by the ids
//! the hub assigned, and its class prototypes, discovered on the class
//! sub-channel.
//!
//! ## Discovery
//!
//! ```text
//!   enumerate_classes()                      enumerate_components() (polled)
//!         │                                          │
//!         ▼                                          ▼
//!   class channel: CLASS @ comp k          hello @ comp 0 ──▶ NewComponent
//!         │  (k = arrival index + 1)                            │
//!         ▼                                   assign_component_id(id)
//!   prototype k negotiates (see component)                      │
//!         │                                                     ▼
//!         ▼                                   live proxy negotiates, on Ready:
//!   all prototypes ready ──▶ Ready            named, indexed, ComponentReady
//! ```
//!
//! A live component whose class was never enumerated donates a non-factory
//! prototype on its first readiness. Non-factory components are named
//! `<type>_<serial as %08X>`.

mod directory;
mod discovery;

#[cfg(test)]
mod tests;

pub use directory::ModuleProxy;

/// Notifications produced while handling inbound module traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleEvent {
    /// An unaddressed component announced itself and needs an id.
    NewComponent,
    /// A live proxy was created for this id.
    ComponentAdded(u16),
    /// The component finished negotiation and is indexed by name.
    ComponentReady(u16),
    /// The component's description or name changed after readiness.
    ComponentInfoChanged(u16),
    /// The module reported the component gone.
    ComponentKilled { id: u16, name: String },
    /// Every known class prototype is ready.
    Ready,
    /// Free-form text from the module or one of its components.
    Message {
        text: String,
        component: Option<String>,
    },
    ObjectReceived { component: u16, oid: u8 },
    ObjectChanged { component: u16, oid: u8 },
}
