//! # Scheme Store
//!
//! The declarative desired state of the hub: which components should exist
//! in which module, and which output feeds which input.
//!
//! ## Model
//!
//! | Type | Role |
//! |------|------|
//! | [`ComponentInfo`] | scheme node: `(name, type, module)`, settings, position |
//! | [`ComponentConnection`] | scheme edge addressed by component/object names |
//! | [`Scheme`] | nodes, edges, output/input indexes, change log |
//!
//! Mutations record [`SchemeChange`]s instead of calling back; the owner
//! drains them with [`Scheme::take_changes`] and reacts. A rename records
//! `Components` and `Connections` once each however many edges it rewrites.

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod component_info;
mod connection;
mod errors;
mod persistence;
mod scheme;

pub use component_info::ComponentInfo;
pub use connection::ComponentConnection;
pub use errors::SchemeError;
pub use scheme::{Scheme, SchemeChange};
