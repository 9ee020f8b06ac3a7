//! # Component Proxy
//!
//! Host-side mirror of one component. The proxy negotiates the component's
//! object list and metadata over the service channel, then carries data
//! traffic for those objects.
//!
//! ## Negotiation
//!
//! ```text
//!  request_info()          objectCount            objectInfo / meta
//! ┌─────────────┐  ───────────────────▶ ┌─────────────┐ ──────────────▶ ┌───────┐
//! │ Discovering │                       │ MetaPending │                 │ Ready │
//! └─────────────┘                       └─────────────┘ ◀────────────── └───────┘
//!                                                       objectCount changes
//! ```
//!
//! The first entry into `Ready` yields [`ComponentEvent::Ready`]; every later
//! re-satisfaction yields [`ComponentEvent::InfoChanged`].
//!
//! The twelve service objects are bound at ids `0..12` in the order of
//! [`ServiceInfo`]'s fields; that order is part of the wire contract.

mod proxy;
mod negotiation;


pub use self::proxy::{ChannelKind, ComponentEvent, ComponentProxy, NegotiationState, Subscription};

use crate::domain::{svc, BusType};

/// Values of the bound service objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceInfo {
    pub class_id: u32,
    pub name: String,
    pub info: String,
    pub serial: u32,
    pub version: u16,
    pub release_info: String,
    pub hardware_info: String,
    pub burn_count: u32,
    pub object_count: u8,
    pub bus_type: BusType,
    pub class_name: String,
    pub icon: Vec<u8>,
}

impl ServiceInfo {
    /// Store one service object reply. Short integers are zero-extended.
    fn write(&mut self, oid: u8, data: &[u8]) {
        match oid {
            svc::CLASS => self.class_id = le_u32(data),
            svc::NAME => self.name = text(data),
            svc::INFO => self.info = text(data),
            svc::SERIAL => self.serial = le_u32(data),
            svc::VERSION => self.version = le_u32(data) as u16,
            svc::RELEASE_INFO => self.release_info = text(data),
            svc::HARDWARE_INFO => self.hardware_info = text(data),
            svc::BURN_COUNT => self.burn_count = le_u32(data),
            svc::OBJECT_COUNT => self.object_count = data.first().copied().unwrap_or(0),
            svc::BUS_TYPE => self.bus_type = BusType::from_code(data.first().copied().unwrap_or(0)),
            svc::CLASS_NAME => self.class_name = text(data),
            svc::ICON => self.icon = data.to_vec(),
            _ => {}
        }
    }
}

fn le_u32(data: &[u8]) -> u32 {
    let mut bytes = [0u8; 4];
    let n = data.len().min(4);
    bytes[..n].copy_from_slice(&data[..n]);
    u32::from_le_bytes(bytes)
}

fn text(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_end_matches('\0')
        .to_string()
}
