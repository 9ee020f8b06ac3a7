//! Inbound packet handling and the readiness check.

use super::proxy::{ComponentEvent, ComponentProxy, NegotiationState};
use crate::domain::svc;
use crate::domain::{Object, ObjectDescription, Packet};
use tracing::{debug, warn};

/// Service objects that must have arrived before the component can be ready.
const REQUIRED_SERVICE: u16 = (1 << svc::CLASS) | (1 << svc::NAME) | (1 << svc::OBJECT_COUNT);

/// Offset of the value inside a timed object payload: `[oid, 0, ts:u32]`.
const TIMED_HEADER_LEN: usize = 6;

impl ComponentProxy {
    /// Handle one packet addressed to this component.
    ///
    /// Packets for another component id are dropped; service packets are
    /// only honoured when host-local.
    pub fn receive(&mut self, packet: &Packet) -> Vec<ComponentEvent> {
        let header = packet.header();
        let mut events = Vec::new();

        if header.component_id != 0 && header.component_id != self.id {
            debug!(
                component_id = self.id,
                addressed = header.component_id,
                "Discarding packet for another component"
            );
            return events;
        }

        if header.svc {
            if header.local {
                self.parse_service(header.object_id, packet.payload(), &mut events);
            }
        } else {
            self.parse_data(header.object_id, packet.payload(), &mut events);
        }
        events
    }

    fn parse_service(&mut self, oid: u8, data: &[u8], events: &mut Vec<ComponentEvent>) {
        if oid < svc::SERVICE_OBJECT_COUNT {
            self.info.write(oid, data);
            self.svc_received |= 1 << oid;
        }

        match oid {
            svc::OBJECT_COUNT => self.resize_objects(events),
            svc::OBJECT_INFO => match ObjectDescription::decode(data) {
                Ok(desc) => self.prepare_object(desc, events),
                Err(e) => warn!(component_id = self.id, error = %e, "Bad object description"),
            },
            svc::OBJECT_META_FIRST..=svc::OBJECT_META_LAST => {
                let Some((&target, meta)) = data.split_first() else {
                    return;
                };
                let code = oid - svc::OBJECT_INFO;
                let newly_received = match self.object_mut(target) {
                    Some(obj) => obj.write_meta(code, meta),
                    None => false,
                };
                if newly_received {
                    self.check_for_ready(events);
                }
            }
            svc::TIMED_OBJECT => {
                if data.len() < TIMED_HEADER_LEN {
                    debug!(component_id = self.id, len = data.len(), "Short timed object");
                    return;
                }
                let target = data[0];
                let timestamp = u32::from_le_bytes([data[2], data[3], data[4], data[5]]);
                if let Some(obj) = self.object_mut(target) {
                    obj.write_timed(timestamp, &data[TIMED_HEADER_LEN..]);
                    self.announce_write(target, events);
                }
            }
            svc::FAIL => {
                if let Some(&failed) = data.first() {
                    self.retry_failed(failed);
                }
            }
            _ if oid < svc::SERVICE_OBJECT_COUNT && !self.ready_once => {
                self.check_for_ready(events);
            }
            _ => {}
        }
    }

    fn parse_data(&mut self, oid: u8, data: &[u8], events: &mut Vec<ComponentEvent>) {
        if let Some(obj) = self.object_mut(oid) {
            obj.write(data);
            self.announce_write(oid, events);
        }
    }

    fn announce_write(&mut self, oid: u8, events: &mut Vec<ComponentEvent>) {
        events.push(ComponentEvent::ObjectReceived(oid));
        if self.object_mut(oid).is_some_and(Object::take_changed) {
            events.push(ComponentEvent::ObjectChanged(oid));
        }
    }

    /// Apply a new object count: a shrink drops every object, a grow keeps
    /// existing slots. Descriptions are requested for the new slots only.
    fn resize_objects(&mut self, events: &mut Vec<ComponentEvent>) {
        let count = usize::from(self.info.object_count);
        let mut old = self.objects.len();
        if old > count {
            self.objects.clear();
            self.names.clear();
            old = 0;
        }
        if old == count && self.state != NegotiationState::Discovering {
            return;
        }

        self.objects.resize_with(count, || None);
        self.state = NegotiationState::MetaPending;
        for slot in old..count {
            // count is at most u8::MAX
            self.send_service(svc::OBJECT_INFO, vec![slot as u8]);
        }
        if count == 0 {
            self.check_for_ready(events);
        }
    }

    fn prepare_object(&mut self, desc: ObjectDescription, events: &mut Vec<ComponentEvent>) {
        let oid = desc.id;
        let Some(slot) = self.objects.get_mut(usize::from(oid)) else {
            debug!(component_id = self.id, oid, "Object id out of bounds");
            return;
        };
        if let Some(old) = slot.take() {
            self.names.remove(old.name());
        }

        let ext_flags = desc.ext_flags;
        self.names.insert(desc.name.clone(), oid);
        *slot = Some(Object::new(desc));

        for bit in 0..16u8 {
            if ext_flags & (1 << bit) != 0 {
                self.send_service(svc::OBJECT_META_FIRST + bit, vec![oid]);
            }
        }
        self.check_for_ready(events);
    }

    /// Bounded re-request after a `fail` reply.
    fn retry_failed(&self, failed: u8) {
        match failed {
            svc::REQUEST_ALL_INFO => {
                for oid in 0..svc::SERVICE_OBJECT_COUNT {
                    self.send_service(oid, Vec::new());
                }
            }
            svc::REQUEST_OBJ_INFO => {
                for slot in 0..self.objects.len() {
                    self.send_service(svc::OBJECT_INFO, vec![slot as u8]);
                }
            }
            svc::SUBSCRIBE => warn!(component = %self.info.name, "Subscribe failed"),
            svc::TIMED_REQUEST => {
                warn!(component = %self.info.name, "Subscribe with timestamp failed");
            }
            other => debug!(
                component = %self.info.name,
                failed = svc::name_of(other),
                "Request failed"
            ),
        }
    }

    /// Ready iff the identity is known and every object is valid.
    pub(super) fn check_for_ready(&mut self, events: &mut Vec<ComponentEvent>) {
        let complete = self.svc_received & REQUIRED_SERVICE == REQUIRED_SERVICE
            && self.state != NegotiationState::Discovering
            && self
                .objects
                .iter()
                .all(|o| o.as_ref().is_some_and(Object::is_valid));

        if !complete {
            if self.state == NegotiationState::Ready {
                self.state = NegotiationState::MetaPending;
            }
            return;
        }

        self.state = NegotiationState::Ready;
        if self.ready_once {
            debug!(component = %self.info.name, "Component info changed");
            events.push(ComponentEvent::InfoChanged);
        } else {
            self.ready_once = true;
            events.push(ComponentEvent::Ready);
        }
    }
}
