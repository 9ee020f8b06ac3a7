//! Service object ids.
//!
//! Ids 0..=11 are the per-component service objects, bound in this exact
//! order on every component. The remaining ids are control requests. Module
//! binaries rely on these values; never renumber them.

/// Class id (`u32`).
pub const CLASS: u8 = 0x00;
/// Component name (UTF-8).
pub const NAME: u8 = 0x01;
/// Free-form component info (UTF-8).
pub const INFO: u8 = 0x02;
/// Serial number (`u32`).
pub const SERIAL: u8 = 0x03;
/// Version, major in the high byte (`u16`).
pub const VERSION: u8 = 0x04;
/// Release info (UTF-8).
pub const RELEASE_INFO: u8 = 0x05;
/// Hardware info (UTF-8).
pub const HARDWARE_INFO: u8 = 0x06;
/// Flash burn count (`u32`).
pub const BURN_COUNT: u8 = 0x07;
/// Number of objects (`u8`).
pub const OBJECT_COUNT: u8 = 0x08;
/// Bus type (`u8`, see [`BusType`]).
pub const BUS_TYPE: u8 = 0x09;
/// Class (component type) name (UTF-8).
pub const CLASS_NAME: u8 = 0x0A;
/// Icon image bytes.
pub const ICON: u8 = 0x0B;

/// Number of bound service objects.
pub const SERVICE_OBJECT_COUNT: u8 = 12;

/// Object description request/reply.
pub const OBJECT_INFO: u8 = 0x10;
/// First object metadata id; metadata kind `k` uses `OBJECT_INFO + k`.
pub const OBJECT_META_FIRST: u8 = 0x11;
/// Last object metadata id (16 slots).
pub const OBJECT_META_LAST: u8 = 0x20;
/// Timestamped object value.
pub const TIMED_OBJECT: u8 = 0x21;

/// Periodic value push request (auto-request).
pub const SUBSCRIBE: u8 = 0xE0;
/// Cancel a periodic value push.
pub const UNSUBSCRIBE: u8 = 0xE1;
/// Periodic timestamped value push request.
pub const TIMED_REQUEST: u8 = 0xE2;

/// Request every service object.
pub const REQUEST_ALL_INFO: u8 = 0xF0;
/// Request every object description.
pub const REQUEST_OBJ_INFO: u8 = 0xF1;
/// Create a component instance.
pub const CREATE: u8 = 0xF2;
/// Delete a component instance (also sent by the module when one goes away).
pub const KILL: u8 = 0xF3;
/// Assign a component id to a new component.
pub const WELCOME: u8 = 0xF4;
/// Text message from a module or component.
pub const MESSAGE: u8 = 0xF5;
/// Echo request/reply.
pub const ECHO: u8 = 0xFD;
/// Announcement of a new, unaddressed component.
pub const HELLO: u8 = 0xFE;
/// A request failed; payload byte 0 is the failed service id.
pub const FAIL: u8 = 0xFF;

/// Address-level poll for live components.
pub const POLL_NODES: u8 = 0xA0;
/// Address-level poll for component classes.
pub const POLL_CLASSES: u8 = 0xA1;

/// Human-readable name of a service id, for logs.
#[must_use]
pub fn name_of(id: u8) -> &'static str {
    match id {
        CLASS => "class",
        NAME => "name",
        INFO => "info",
        SERIAL => "serial",
        VERSION => "version",
        RELEASE_INFO => "releaseInfo",
        HARDWARE_INFO => "hardwareInfo",
        BURN_COUNT => "burnCount",
        OBJECT_COUNT => "objectCount",
        BUS_TYPE => "busType",
        CLASS_NAME => "className",
        ICON => "icon",
        OBJECT_INFO => "objectInfo",
        OBJECT_META_FIRST..=OBJECT_META_LAST => "objectMeta",
        TIMED_OBJECT => "timedObject",
        SUBSCRIBE => "subscribe",
        UNSUBSCRIBE => "unsubscribe",
        TIMED_REQUEST => "timedRequest",
        REQUEST_ALL_INFO => "requestAllInfo",
        REQUEST_OBJ_INFO => "requestObjInfo",
        CREATE => "create",
        KILL => "kill",
        WELCOME => "welcome",
        MESSAGE => "message",
        ECHO => "echo",
        HELLO => "hello",
        FAIL => "fail",
        POLL_NODES => "pollNodes",
        POLL_CLASSES => "pollClasses",
        _ => "unknown",
    }
}

/// Physical bus a component sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusType {
    #[default]
    Unknown,
    Can,
    UsbHid,
    Wifi,
    Swonb,
    Virtual,
    Radio,
    Ethernet,
}

impl BusType {
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Can,
            2 => Self::UsbHid,
            3 => Self::Wifi,
            4 => Self::Swonb,
            5 => Self::Virtual,
            6 => Self::Radio,
            7 => Self::Ethernet,
            _ => Self::Unknown,
        }
    }

    /// Buses that cannot push values on their own; the host polls instead.
    #[must_use]
    pub fn needs_local_polling(self) -> bool {
        matches!(self, Self::Swonb | Self::Radio)
    }
}
