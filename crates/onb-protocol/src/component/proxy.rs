//! Component proxy state and outbound commands.

use super::ServiceInfo;
use crate::domain::svc;
use crate::domain::{ComponentError, Header, Object, Packet, Value};
use crate::sink::PacketSink;
use serde_json::{json, Map, Value as Json};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Negotiation progress of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Waiting for the object count.
    Discovering,
    /// Object descriptions or metadata still outstanding.
    MetaPending,
    Ready,
}

/// Notifications produced while handling inbound packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentEvent {
    /// First time every object became valid.
    Ready,
    /// Valid again after a later change (metadata, layout, name).
    InfoChanged,
    /// A data value arrived for the object.
    ObjectReceived(u8),
    /// The arrived value differs from the previous one.
    ObjectChanged(u8),
}

/// Object classification used for channel listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Inputs,
    Outputs,
    Settings,
}

/// Outcome of a subscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    /// The module pushes values itself.
    Remote,
    /// The bus cannot push; the owner must poll at this period.
    LocalPoll(u32),
}

/// Host-side proxy of one component (or class prototype).
#[derive(Debug)]
pub struct ComponentProxy {
    pub(super) id: u16,
    pub(super) info: ServiceInfo,
    pub(super) svc_received: u16,
    pub(super) objects: Vec<Option<Object>>,
    pub(super) names: HashMap<String, u8>,
    pub(super) state: NegotiationState,
    pub(super) ready_once: bool,
    pub(super) is_factory: bool,
    pub(super) sink: PacketSink,
}

impl ComponentProxy {
    /// Create a proxy addressed by `id` that sends through `sink`.
    #[must_use]
    pub fn new(id: u16, sink: PacketSink) -> Self {
        Self {
            id,
            info: ServiceInfo::default(),
            svc_received: 0,
            objects: Vec::new(),
            names: HashMap::new(),
            state: NegotiationState::Discovering,
            ready_once: false,
            is_factory: true,
            sink,
        }
    }

    #[must_use]
    pub fn id(&self) -> u16 {
        self.id
    }

    #[must_use]
    pub fn info(&self) -> &ServiceInfo {
        &self.info
    }

    #[must_use]
    pub fn class_id(&self) -> u32 {
        self.info.class_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Component type, i.e. the class name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.info.class_name
    }

    #[must_use]
    pub fn state(&self) -> NegotiationState {
        self.state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == NegotiationState::Ready
    }

    /// Whether named instances of this class can be created on demand.
    #[must_use]
    pub fn is_factory(&self) -> bool {
        self.is_factory
    }

    pub fn set_factory(&mut self, factory: bool) {
        self.is_factory = factory;
    }

    /// Rename locally. [`ModuleProxy::rename_component`] also tells the module.
    ///
    /// [`ModuleProxy::rename_component`]: crate::ModuleProxy::rename_component
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.info.name = name.into();
    }

    pub(crate) fn set_type_name(&mut self, name: impl Into<String>) {
        self.info.class_name = name.into();
    }

    #[must_use]
    pub fn object(&self, oid: u8) -> Option<&Object> {
        self.objects.get(usize::from(oid)).and_then(Option::as_ref)
    }

    pub fn object_mut(&mut self, oid: u8) -> Option<&mut Object> {
        self.objects.get_mut(usize::from(oid)).and_then(Option::as_mut)
    }

    #[must_use]
    pub fn object_id(&self, name: &str) -> Option<u8> {
        self.names.get(name).copied()
    }

    #[must_use]
    pub fn object_by_name(&self, name: &str) -> Option<&Object> {
        self.object_id(name).and_then(|oid| self.object(oid))
    }

    pub fn object_by_name_mut(&mut self, name: &str) -> Option<&mut Object> {
        let oid = self.object_id(name)?;
        self.object_mut(oid)
    }

    /// Every present object in id order.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter().flatten()
    }

    #[must_use]
    pub fn channels(&self, kind: ChannelKind) -> Vec<&Object> {
        self.objects()
            .filter(|o| {
                let flags = o.description().flags;
                match kind {
                    ChannelKind::Inputs => flags.is_input(),
                    ChannelKind::Outputs => flags.is_output(),
                    ChannelKind::Settings => flags.is_setting(),
                }
            })
            .collect()
    }

    /// Channel name to type name. Inputs report their read type, outputs
    /// their write type.
    #[must_use]
    pub fn channel_map(&self, kind: ChannelKind) -> BTreeMap<String, String> {
        self.channels(kind)
            .into_iter()
            .map(|o| {
                let d = o.description();
                let ty = match kind {
                    ChannelKind::Outputs => d.write_type,
                    ChannelKind::Inputs | ChannelKind::Settings => d.read_type,
                };
                (d.name.clone(), ty.name().to_string())
            })
            .collect()
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    pub(super) fn send_service(&self, oid: u8, payload: impl Into<Vec<u8>>) {
        self.sink
            .push(Packet::new(Header::service(oid, self.id), payload));
    }

    fn send_data(&self, oid: u8, payload: Vec<u8>) {
        self.sink.push(Packet::new(Header::data(oid, self.id), payload));
    }

    /// Ask for class id, name and every other service object.
    pub fn request_info(&self) {
        self.send_service(svc::CLASS, Vec::new());
        self.send_service(svc::NAME, Vec::new());
        self.send_service(svc::REQUEST_ALL_INFO, Vec::new());
    }

    /// Ask the module for the current value of an object.
    pub fn request_object(&self, oid: u8) {
        if usize::from(oid) < self.objects.len() {
            self.send_data(oid, Vec::new());
        }
    }

    /// Send the object's read-side value to the module.
    pub fn send_object(&self, oid: u8) {
        if let Some(obj) = self.object(oid) {
            self.send_data(oid, obj.read());
        }
    }

    /// Send the object's value prefixed with its (or its publisher's)
    /// timestamp.
    pub fn send_timed_object(&self, oid: u8) {
        if let Some(obj) = self.object(oid) {
            let mut payload = vec![oid, 0];
            payload.extend_from_slice(&obj.timestamp().to_le_bytes());
            payload.extend_from_slice(&obj.read());
            self.send_service(svc::TIMED_OBJECT, payload);
        }
    }

    /// Ask for periodic pushes of an output.
    pub fn subscribe(&mut self, name: &str, period_ms: i32) -> Result<Subscription, ComponentError> {
        let bus = self.info.bus_type;
        let obj = self
            .object_by_name_mut(name)
            .ok_or_else(|| ComponentError::UnknownObject(name.to_string()))?;
        let flags = obj.description().flags;
        if !(flags.is_volatile() && flags.is_writable()) {
            return Err(ComponentError::NotSubscribable(name.to_string()));
        }

        if bus.needs_local_polling() {
            let period = u32::try_from(period_ms).unwrap_or(0);
            obj.set_auto_request(Some(period));
            return Ok(Subscription::LocalPoll(period));
        }

        let oid = obj.id();
        let service = if obj.meta().ext_info.need_timestamp {
            svc::TIMED_REQUEST
        } else {
            svc::SUBSCRIBE
        };
        let mut payload = period_ms.to_le_bytes().to_vec();
        payload.push(oid);
        self.send_service(service, payload);
        Ok(Subscription::Remote)
    }

    /// Cancel periodic pushes (or the local poll) of an output.
    pub fn unsubscribe(&mut self, name: &str) -> Result<(), ComponentError> {
        let bus = self.info.bus_type;
        let obj = self
            .object_by_name_mut(name)
            .ok_or_else(|| ComponentError::UnknownObject(name.to_string()))?;
        if bus.needs_local_polling() {
            obj.set_auto_request(None);
        } else {
            let oid = obj.id();
            self.send_service(svc::UNSUBSCRIBE, vec![oid]);
        }
        Ok(())
    }

    pub fn unsubscribe_all(&self) {
        self.send_service(svc::UNSUBSCRIBE, Vec::new());
    }

    /// Store a value on the object and send it if it changed.
    pub fn set_value(&mut self, name: &str, value: &Value) -> Result<(), ComponentError> {
        let obj = self
            .object_by_name_mut(name)
            .ok_or_else(|| ComponentError::UnknownObject(name.to_string()))?;
        let oid = obj.id();
        if obj.set_value(value)? {
            self.send_object(oid);
        }
        Ok(())
    }

    // =========================================================================
    // SETTINGS AND DESCRIPTORS
    // =========================================================================

    /// Current setting values as `{"<name>": {"value": ...}}`.
    #[must_use]
    pub fn settings_json(&self) -> Map<String, Json> {
        self.channels(ChannelKind::Settings)
            .into_iter()
            .filter_map(|o| {
                let value = o.value().or_else(|| o.read_value())?;
                Some((o.name().to_string(), json!({ "value": value.to_json() })))
            })
            .collect()
    }

    /// Apply stored settings, sending each value that changed.
    ///
    /// Unknown names and unconvertible values are skipped.
    pub fn apply_settings(&mut self, settings: &Map<String, Json>) {
        for (name, entry) in settings {
            let raw = entry.get("value").unwrap_or(entry);
            let Some(obj) = self.object_by_name(name) else {
                debug!(component = %self.info.name, setting = %name, "No such setting");
                continue;
            };
            let Some(value) = Value::from_json(raw, &obj.description().read_layout()) else {
                warn!(component = %self.info.name, setting = %name, "Setting value does not fit object type");
                continue;
            };
            if let Err(e) = self.set_value(name, &value) {
                warn!(component = %self.info.name, setting = %name, error = %e, "Setting rejected");
            }
        }
    }

    /// Component description as written to config files.
    #[must_use]
    pub fn info_json(&self) -> Json {
        let describe = |kind| {
            self.channels(kind)
                .into_iter()
                .map(Object::json_description)
                .collect::<Vec<_>>()
        };
        json!({
            "classID": self.info.class_id.to_string(),
            "type": self.info.class_name,
            "name": self.info.name,
            "info": self.info.info,
            "serial": self.info.serial.to_string(),
            "version": self.info.version.to_string(),
            "releaseinfo": self.info.release_info,
            "hardware": self.info.hardware_info,
            "inputs": describe(ChannelKind::Inputs),
            "outputs": describe(ChannelKind::Outputs),
        })
    }

    /// Build a reusable class prototype from this (ready) component.
    ///
    /// Values are not copied; the serial is cleared and an empty class name
    /// falls back to the component name.
    #[must_use]
    pub fn extract_prototype(&self, id: u16, sink: PacketSink) -> ComponentProxy {
        let mut proto = ComponentProxy::new(id, sink);
        proto.info = ServiceInfo {
            serial: 0,
            name: String::new(),
            ..self.info.clone()
        };
        if proto.info.class_name.is_empty() {
            proto.info.class_name = self.info.name.clone();
        }
        proto.svc_received = self.svc_received;
        proto.objects = self
            .objects
            .iter()
            .map(|o| o.as_ref().map(Object::prototype))
            .collect();
        proto.names = self.names.clone();
        proto.state = self.state;
        proto.ready_once = self.ready_once;
        proto
    }
}
