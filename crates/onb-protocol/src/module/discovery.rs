//! Inbound module traffic: module-level service packets, class discovery and
//! dispatch to live components.

use super::directory::ModuleProxy;
use super::ModuleEvent;
use crate::component::{ComponentEvent, ComponentProxy};
use crate::domain::svc;
use crate::domain::{Header, Packet, PacketError};
use tracing::{debug, info};

impl ModuleProxy {
    /// Decode one transport frame and handle it.
    pub fn receive_frame(&mut self, frame: &[u8]) -> Result<Vec<ModuleEvent>, PacketError> {
        let packet = Packet::decode(frame)?;
        Ok(self.receive_packet(&packet))
    }

    /// Handle one packet from the module.
    pub fn receive_packet(&mut self, packet: &Packet) -> Vec<ModuleEvent> {
        let header = *packet.header();
        let mut events = Vec::new();

        if header.class_info {
            self.parse_class_info(packet, &mut events);
            return events;
        }

        self.parse_module_packet(packet, &mut events);
        if let Some(component) = self.components.get_mut(&header.component_id) {
            let component_events = component.receive(packet);
            self.dispatch(header.component_id, component_events, &mut events);
        }
        events
    }

    fn parse_module_packet(&mut self, packet: &Packet, events: &mut Vec<ModuleEvent>) {
        let header = packet.header();
        if !header.svc {
            return;
        }
        let comp_id = header.component_id;

        match header.object_id {
            svc::ICON if comp_id == 0 => self.icon = packet.payload().to_vec(),
            svc::ECHO | svc::HELLO if comp_id == 0 => events.push(ModuleEvent::NewComponent),
            svc::KILL => {
                if let Some(component) = self.components.remove(&comp_id) {
                    let name = component.name().to_string();
                    if self.component_names.get(&name) == Some(&comp_id) {
                        self.component_names.remove(&name);
                    }
                    info!(module = %self.name, component = %name, component_id = comp_id, "Component killed");
                    events.push(ModuleEvent::ComponentKilled { id: comp_id, name });
                }
            }
            svc::MESSAGE => {
                let text = String::from_utf8_lossy(packet.payload())
                    .trim_end_matches('\0')
                    .to_string();
                let component = self
                    .components
                    .get(&comp_id)
                    .map(|c| c.name().to_string());
                info!(
                    module = %self.name,
                    component = component.as_deref().unwrap_or(""),
                    "{text}"
                );
                events.push(ModuleEvent::Message { text, component });
            }
            _ => {}
        }
    }

    fn parse_class_info(&mut self, packet: &Packet, events: &mut Vec<ModuleEvent>) {
        let header = *packet.header();

        if header.component_id == 0 {
            // a class id at address 0 means the module has no classes
            if header.object_id == svc::CLASS && self.classes.is_empty() {
                self.set_ready(true, events);
            }
            return;
        }

        let idx = usize::from(header.component_id - 1);
        if idx == self.classes.len() {
            if header.object_id != svc::CLASS || packet.payload().len() < 4 {
                debug!(module = %self.name, class_index = idx, "Unknown class info received");
                return;
            }
            let p = packet.payload();
            let class_id = u32::from_le_bytes([p[0], p[1], p[2], p[3]]);
            self.classes.push(class_id);

            let mut proto = ComponentProxy::new(header.component_id, self.sink.class_channel());
            proto.receive(packet);
            self.class_info.insert(class_id, proto);

            self.sink.push(
                Packet::new(
                    Header::service(svc::REQUEST_ALL_INFO, header.component_id),
                    class_id.to_le_bytes().to_vec(),
                )
                .into_class_channel(),
            );
            debug!(module = %self.name, class_id, "Class discovered");
        } else if idx < self.classes.len() {
            let class_id = self.classes[idx];
            if let Some(proto) = self.class_info.get_mut(&class_id) {
                proto.receive(packet);
                if proto.is_ready() {
                    if proto.type_name().is_empty() {
                        let name = proto.name().to_string();
                        proto.set_type_name(name);
                    }
                    self.class_names.insert(proto.type_name().to_string(), class_id);
                }
            }
        } else {
            debug!(module = %self.name, class_index = idx, "Unknown class info received");
        }

        let all_ready = self.class_info.values().all(ComponentProxy::is_ready);
        self.set_ready(all_ready, events);
    }

    /// Track module readiness; `Ready` is emitted on the rising edge only.
    fn set_ready(&mut self, ready: bool, events: &mut Vec<ModuleEvent>) {
        if ready && !self.ready {
            info!(module = %self.name, classes = self.classes.len(), "Module ready");
            events.push(ModuleEvent::Ready);
        }
        self.ready = ready;
    }

    fn dispatch(&mut self, id: u16, component_events: Vec<ComponentEvent>, events: &mut Vec<ModuleEvent>) {
        for event in component_events {
            match event {
                ComponentEvent::Ready => self.component_ready(id, events),
                ComponentEvent::InfoChanged => self.component_info_changed(id, events),
                ComponentEvent::ObjectReceived(oid) => {
                    events.push(ModuleEvent::ObjectReceived { component: id, oid });
                }
                ComponentEvent::ObjectChanged(oid) => {
                    events.push(ModuleEvent::ObjectChanged { component: id, oid });
                }
            }
        }
    }

    fn component_ready(&mut self, id: u16, events: &mut Vec<ModuleEvent>) {
        let Some(component) = self.components.get(&id) else {
            return;
        };
        let class_id = component.class_id();

        let mut synthesized = false;
        if !self.class_info.contains_key(&class_id) {
            self.classes.push(class_id);
            // at most u16::MAX classes fit the class channel
            let proto_id = self.classes.len() as u16;
            let mut proto = component.extract_prototype(proto_id, self.sink.class_channel());
            proto.set_factory(false);
            self.class_names.insert(proto.type_name().to_string(), class_id);
            self.class_info.insert(class_id, proto);
            synthesized = true;
        }

        let (proto_type, factory) = match self.class_info.get(&class_id) {
            Some(proto) => (proto.type_name().to_string(), proto.is_factory()),
            None => return,
        };
        let Some(component) = self.components.get_mut(&id) else {
            return;
        };
        if component.type_name().is_empty() {
            component.set_type_name(proto_type);
        }
        if !factory {
            let name = format!("{}_{:08X}", component.type_name(), component.info().serial);
            component.set_name(name);
        }

        let name = component.name().to_string();
        info!(
            module = %self.name,
            component = %name,
            component_id = id,
            class = %component.type_name(),
            "Component ready"
        );
        self.component_names.insert(name, id);
        events.push(ModuleEvent::ComponentReady(id));

        if synthesized {
            events.push(ModuleEvent::Ready);
        }
    }

    fn component_info_changed(&mut self, id: u16, events: &mut Vec<ModuleEvent>) {
        let Some(component) = self.components.get(&id) else {
            return;
        };
        let name = component.name().to_string();
        if self.component_names.get(&name) != Some(&id) {
            self.component_names.retain(|_, v| *v != id);
            debug!(module = %self.name, component = %name, component_id = id, "Component re-indexed");
            self.component_names.insert(name, id);
        }
        events.push(ModuleEvent::ComponentInfoChanged(id));
    }
}
