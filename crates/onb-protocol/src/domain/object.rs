//! # Live Objects
//!
//! An [`Object`] is one channel of a component: its description, the metadata
//! gathered so far and up to two value buffers.
//!
//! ## Buffers
//!
//! ```text
//!   module ──write()──▶ [ write buffer ] ──publisher_handle()──▶ linked subscribers
//!                              │
//!                              │ aliased unless DUAL
//!                              ▼
//!   module ◀──read()─── [ read buffer ] ◀── set_value()
//! ```
//!
//! While linked, `read()` serves the publisher's write buffer instead of the
//! object's own read buffer. The link holds a shared handle to that buffer,
//! never the publishing object itself; `detach` drops it and the own buffer
//! becomes visible again unchanged.

use super::description::{MetaKind, ObjectDescription, ObjectMeta};
use super::errors::{LinkError, ValueError};
use super::value::{Layout, Value, ValueType};
use parking_lot::RwLock;
use serde_json::{json, Map, Value as Json};
use std::sync::Arc;
use tracing::warn;

/// Value plus the timestamp of the delivery that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectBuffer {
    pub value: Value,
    pub timestamp: u32,
}

/// Buffer shared between a publisher and the subscribers linked to it.
pub type SharedBuffer = Arc<RwLock<ObjectBuffer>>;

fn new_buffer(layout: &Layout) -> SharedBuffer {
    Arc::new(RwLock::new(ObjectBuffer {
        value: Value::zero(layout),
        timestamp: 0,
    }))
}

/// Borrowed view of a publisher's write side, used to link subscribers.
#[derive(Debug, Clone)]
pub struct PublisherHandle {
    buffer: SharedBuffer,
    layout: Layout,
    rmip: u16,
    need_timestamp: bool,
}

impl PublisherHandle {
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Publisher's own recommended minimum interval, milliseconds.
    #[must_use]
    pub fn rmip(&self) -> u16 {
        self.rmip
    }

    #[must_use]
    pub fn need_timestamp(&self) -> bool {
        self.need_timestamp
    }

    /// Whether `subscriber` may read straight from this publisher's buffer.
    #[must_use]
    pub fn is_compatible(&self, subscriber: &ObjectDescription) -> bool {
        (self.layout.size > 0 || self.layout.ty == ValueType::Common)
            && self.layout.ty == subscriber.read_type
            && self.layout.size == subscriber.read_size
    }
}

/// One live object owned by a component.
#[derive(Debug)]
pub struct Object {
    desc: ObjectDescription,
    meta: ObjectMeta,
    ext_received: u16,
    write_buf: Option<SharedBuffer>,
    read_buf: Option<SharedBuffer>,
    link: Option<SharedBuffer>,
    changed: bool,
    auto_request: Option<u32>,
}

impl Object {
    #[must_use]
    pub fn new(desc: ObjectDescription) -> Self {
        let (write_buf, read_buf) = if desc.is_valid() {
            let write_buf = desc
                .has_write_buffer()
                .then(|| new_buffer(&desc.write_layout()));
            let read_buf = if desc.has_read_buffer() {
                match (&write_buf, desc.flags.is_dual()) {
                    (Some(shared), false) => Some(Arc::clone(shared)),
                    _ => Some(new_buffer(&desc.read_layout())),
                }
            } else {
                None
            };
            (write_buf, read_buf)
        } else {
            (None, None)
        };

        Self {
            desc,
            meta: ObjectMeta::default(),
            ext_received: 0,
            write_buf,
            read_buf,
            link: None,
            changed: false,
            auto_request: None,
        }
    }

    /// Fresh object with the same description and metadata but no values.
    #[must_use]
    pub fn prototype(&self) -> Self {
        let mut proto = Self::new(self.desc.clone());
        proto.meta = self.meta.clone();
        proto.ext_received = self.ext_received;
        proto
    }

    #[must_use]
    pub fn id(&self) -> u8 {
        self.desc.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    #[must_use]
    pub fn description(&self) -> &ObjectDescription {
        &self.desc
    }

    #[must_use]
    pub fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    /// Description valid and every announced metadata field received.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.desc.is_valid() && self.desc.ext_flags == self.ext_received
    }

    /// Store a metadata reply. Returns `true` only for a newly received kind.
    pub fn write_meta(&mut self, code: u8, bytes: &[u8]) -> bool {
        if !(1..=16).contains(&code) {
            return false;
        }
        if let Some(kind) = MetaKind::from_code(code) {
            if let Err(e) = self.meta.apply(kind, bytes, &self.desc) {
                warn!(object = %self.desc.name, kind = ?kind, error = %e, "Bad metadata reply");
            }
        }
        let mask = 1u16 << (code - 1);
        if self.ext_received & mask == 0 {
            self.ext_received |= mask;
            true
        } else {
            false
        }
    }

    /// Store a value delivered by the module.
    pub fn write(&mut self, bytes: &[u8]) {
        let Some(buf) = &self.write_buf else {
            return;
        };
        match Value::decode(&self.desc.write_layout(), bytes) {
            Ok(value) => {
                let mut guard = buf.write();
                if guard.value != value {
                    guard.value = value;
                    self.changed = true;
                }
            }
            Err(e) => warn!(object = %self.desc.name, error = %e, "Dropping malformed value"),
        }
    }

    /// Store a timestamped value delivered by the module.
    pub fn write_timed(&mut self, timestamp: u32, bytes: &[u8]) {
        if let Some(buf) = &self.write_buf {
            buf.write().timestamp = timestamp;
        }
        self.write(bytes);
    }

    /// Consume the "changed since last check" flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Last value written by the module.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.write_buf.as_ref().map(|b| b.read().value.clone())
    }

    fn current_read(&self) -> Option<&SharedBuffer> {
        self.link.as_ref().or(self.read_buf.as_ref())
    }

    /// Value that would be sent to the module.
    #[must_use]
    pub fn read_value(&self) -> Option<Value> {
        self.current_read().map(|b| b.read().value.clone())
    }

    /// Encoded value to send to the module.
    #[must_use]
    pub fn read(&self) -> Vec<u8> {
        self.current_read()
            .map(|b| b.read().value.encode())
            .unwrap_or_default()
    }

    /// Timestamp to forward with a timed send.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        self.link
            .as_ref()
            .or(self.write_buf.as_ref())
            .map_or(0, |b| b.read().timestamp)
    }

    /// Store a value in the object's own read buffer.
    ///
    /// Returns `true` when the value differs and should be sent. A linked
    /// object keeps the value for after `detach` and reports `false`.
    pub fn set_value(&mut self, value: &Value) -> Result<bool, ValueError> {
        let Some(buf) = &self.read_buf else {
            return Err(ValueError::NoBuffer(self.desc.name.clone()));
        };
        let layout = self.desc.read_layout();
        let converted = value.coerce(&layout).ok_or_else(|| ValueError::Incompatible {
            from: value.value_type().to_string(),
            to: layout.ty.to_string(),
        })?;
        let mut guard = buf.write();
        if guard.value == converted {
            return Ok(false);
        }
        guard.value = converted;
        Ok(self.link.is_none())
    }

    /// Handle to the write buffer for linking, `None` if there is none.
    #[must_use]
    pub fn publisher_handle(&self) -> Option<PublisherHandle> {
        self.write_buf.as_ref().map(|buffer| PublisherHandle {
            buffer: Arc::clone(buffer),
            layout: self.desc.write_layout(),
            rmip: self.meta.ext_info.rmip,
            need_timestamp: self.meta.ext_info.need_timestamp,
        })
    }

    /// Read from `publisher` from now on.
    ///
    /// Returns `Ok(false)` if the object already reads from that publisher.
    pub fn attach(&mut self, publisher: &PublisherHandle) -> Result<bool, LinkError> {
        if !publisher.is_compatible(&self.desc) {
            return Err(LinkError::Incompatible {
                publisher: format!("{}[{}]", publisher.layout.ty, publisher.layout.size),
                subscriber: format!("{}[{}]", self.desc.read_type, self.desc.read_size),
            });
        }
        if let Some(current) = &self.link {
            if Arc::ptr_eq(current, &publisher.buffer) {
                return Ok(false);
            }
        }
        self.link = Some(Arc::clone(&publisher.buffer));
        if publisher.need_timestamp {
            self.meta.ext_info.need_timestamp = true;
        }
        Ok(true)
    }

    /// Stop reading from `publisher` and fall back to the own buffer.
    pub fn detach(&mut self, publisher: &PublisherHandle) -> Result<(), LinkError> {
        match &self.link {
            Some(current) if Arc::ptr_eq(current, &publisher.buffer) => {
                self.link = None;
                Ok(())
            }
            _ => Err(LinkError::NotLinked),
        }
    }

    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    /// Period of the local auto-request poll, if one is armed.
    #[must_use]
    pub fn auto_request(&self) -> Option<u32> {
        self.auto_request
    }

    pub fn set_auto_request(&mut self, period_ms: Option<u32>) {
        self.auto_request = period_ms;
    }

    /// Channel descriptor used in component info and config files.
    #[must_use]
    pub fn json_description(&self) -> Json {
        let d = &self.desc;
        let mut obj = Map::new();
        obj.insert("name".into(), json!(d.name));
        obj.insert("id".into(), json!(d.id));
        obj.insert("flags".into(), json!(d.flags.to_string()));
        obj.insert("readType".into(), json!(d.read_type.name()));
        obj.insert("writeType".into(), json!(d.write_type.name()));
        obj.insert("readSize".into(), json!(d.read_size));
        obj.insert("writeSize".into(), json!(d.write_size));

        let m = &self.meta;
        for (key, value) in [("min", &m.min), ("max", &m.max), ("def", &m.def), ("step", &m.step)] {
            if let Some(v) = value {
                obj.insert(key.into(), json!(v.to_string()));
            }
        }
        for (key, text) in [
            ("mimeType", &m.mime_type),
            ("hint", &m.hint),
            ("unit", &m.unit),
            ("options", &m.options),
        ] {
            if !text.is_empty() {
                obj.insert(key.into(), json!(text));
            }
        }
        Json::Object(obj)
    }
}
