//! Module directory state and outbound commands.

use crate::component::ComponentProxy;
use crate::domain::svc;
use crate::domain::{Header, ModuleError, Packet};
use crate::sink::PacketSink;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Host-side proxy of one connected module.
#[derive(Debug)]
pub struct ModuleProxy {
    pub(super) name: String,
    pub(super) icon: Vec<u8>,
    pub(super) components: BTreeMap<u16, ComponentProxy>,
    pub(super) component_names: HashMap<String, u16>,
    /// Class ids in class-channel order; index `i` is class component `i + 1`.
    pub(super) classes: Vec<u32>,
    pub(super) class_info: HashMap<u32, ComponentProxy>,
    pub(super) class_names: BTreeMap<String, u32>,
    pub(super) ready: bool,
    pub(super) sink: PacketSink,
}

impl ModuleProxy {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: Vec::new(),
            components: BTreeMap::new(),
            component_names: HashMap::new(),
            classes: Vec::new(),
            class_info: HashMap::new(),
            class_names: BTreeMap::new(),
            ready: false,
            sink: PacketSink::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn icon(&self) -> &[u8] {
        &self.icon
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Outbound queue shared by the module and all of its components.
    #[must_use]
    pub fn sink(&self) -> &PacketSink {
        &self.sink
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    #[must_use]
    pub fn component(&self, id: u16) -> Option<&ComponentProxy> {
        self.components.get(&id)
    }

    pub fn component_mut(&mut self, id: u16) -> Option<&mut ComponentProxy> {
        self.components.get_mut(&id)
    }

    #[must_use]
    pub fn component_by_name(&self, name: &str) -> Option<&ComponentProxy> {
        self.component_names
            .get(name)
            .and_then(|id| self.components.get(id))
    }

    pub fn component_by_name_mut(&mut self, name: &str) -> Option<&mut ComponentProxy> {
        let id = *self.component_names.get(name)?;
        self.components.get_mut(&id)
    }

    /// Every live component, ready or not, in id order.
    pub fn components(&self) -> impl Iterator<Item = &ComponentProxy> {
        self.components.values()
    }

    /// Names of the ready (indexed) components, sorted.
    #[must_use]
    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.component_names.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of the ready components of one type, sorted.
    #[must_use]
    pub fn component_names_of_type(&self, type_name: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .component_names
            .iter()
            .filter(|(_, id)| {
                self.components
                    .get(*id)
                    .is_some_and(|c| c.type_name() == type_name)
            })
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Class ids in discovery order.
    #[must_use]
    pub fn class_ids(&self) -> &[u32] {
        &self.classes
    }

    #[must_use]
    pub fn class_info(&self, class_id: u32) -> Option<&ComponentProxy> {
        self.class_info.get(&class_id)
    }

    #[must_use]
    pub fn class_by_name(&self, type_name: &str) -> Option<&ComponentProxy> {
        self.class_names
            .get(type_name)
            .and_then(|cid| self.class_info.get(cid))
    }

    /// Names of the ready class prototypes, sorted.
    #[must_use]
    pub fn class_names(&self) -> Vec<String> {
        self.class_names.keys().cloned().collect()
    }

    /// Ready class prototypes, sorted by type name.
    pub fn prototypes(&self) -> impl Iterator<Item = &ComponentProxy> {
        self.class_names
            .values()
            .filter_map(|cid| self.class_info.get(cid))
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    fn send(&self, packet: Packet) {
        self.sink.push(packet);
    }

    /// Poll for class prototypes on the class sub-channel.
    pub fn enumerate_classes(&self) {
        let header = Header {
            object_id: svc::POLL_CLASSES,
            component_id: 0,
            svc: true,
            local: false,
            class_info: true,
        };
        self.send(Packet::empty(header));
    }

    /// Poll for live components; unaddressed ones answer with hello.
    pub fn enumerate_components(&self) {
        let header = Header {
            object_id: svc::POLL_NODES,
            component_id: 0,
            svc: true,
            local: false,
            class_info: false,
        };
        self.send(Packet::empty(header));
    }

    pub fn request_icon(&self) {
        self.send(Packet::empty(Header::service(svc::ICON, 0)));
    }

    /// Give a new component its id and start negotiating with it.
    ///
    /// Returns `true` when a new proxy was created for `id`.
    pub fn assign_component_id(&mut self, id: u16) -> bool {
        self.send(Packet::new(
            Header::service(svc::WELCOME, 0),
            id.to_le_bytes().to_vec(),
        ));
        if self.components.contains_key(&id) {
            return false;
        }
        let proxy = ComponentProxy::new(id, self.sink.clone());
        proxy.request_info();
        self.components.insert(id, proxy);
        debug!(module = %self.name, component_id = id, "Component id assigned");
        true
    }

    /// Ask the module to instantiate a factory class, optionally named.
    pub fn create_component(&self, type_name: &str, name: Option<&str>) -> Result<(), ModuleError> {
        let class_id = *self
            .class_names
            .get(type_name)
            .ok_or_else(|| ModuleError::UnknownClass(type_name.to_string()))?;
        self.create_component_of_class(class_id, name)
    }

    pub fn create_component_of_class(&self, class_id: u32, name: Option<&str>) -> Result<(), ModuleError> {
        let proto = self
            .class_info
            .get(&class_id)
            .ok_or_else(|| ModuleError::UnknownClass(class_id.to_string()))?;
        if !proto.is_factory() {
            return Err(ModuleError::NotFactory(proto.type_name().to_string()));
        }

        let mut payload = class_id.to_le_bytes().to_vec();
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            payload.extend_from_slice(name.as_bytes());
        }
        self.send(Packet::new(Header::service(svc::CREATE, 0), payload));
        info!(module = %self.name, class = %proto.type_name(), name = ?name, "Create component requested");
        Ok(())
    }

    /// Ask the module to delete a component by name.
    pub fn delete_component(&self, name: &str) -> Result<(), ModuleError> {
        let id = *self
            .component_names
            .get(name)
            .ok_or_else(|| ModuleError::UnknownComponent(name.to_string()))?;
        self.delete_component_id(id);
        Ok(())
    }

    /// Ask the module to delete a component by id. Returns whether the id is
    /// currently known; the request is sent either way.
    pub fn delete_component_id(&self, id: u16) -> bool {
        self.send(Packet::new(
            Header::service(svc::KILL, 0),
            id.to_le_bytes().to_vec(),
        ));
        info!(module = %self.name, component_id = id, "Delete component requested");
        self.components.contains_key(&id)
    }

    /// Rename a ready component and tell the module. Returns its id.
    pub fn rename_component(&mut self, name: &str, new_name: &str) -> Result<u16, ModuleError> {
        let id = *self
            .component_names
            .get(name)
            .ok_or_else(|| ModuleError::UnknownComponent(name.to_string()))?;
        if self.component_names.contains_key(new_name) {
            return Err(ModuleError::NameTaken(new_name.to_string()));
        }
        self.send(Packet::new(
            Header::service(svc::NAME, id),
            new_name.as_bytes().to_vec(),
        ));
        info!(module = %self.name, component_id = id, from = %name, to = %new_name, "Rename component requested");
        if let Some(component) = self.components.get_mut(&id) {
            component.set_name(new_name);
        }
        self.component_names.remove(name);
        self.component_names.insert(new_name.to_string(), id);
        Ok(id)
    }
}
