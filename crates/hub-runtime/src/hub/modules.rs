//! Module sessions: connect, inbound traffic, component lifecycle, timers
//! and the per-module config cache.

use super::{Hub, HubError, LiveComponent};
use crate::loader::StartType;
use crate::ports::TimerKey;
use hub_telemetry::MODULES_CONNECTED;
use onb_protocol::{ModuleEvent, ModuleProxy, ObjectAddr, Trigger};
use serde_json::{Map, Value as Json};
use shared_bus::HubEvent;
use std::time::Instant;
use tracing::{debug, info, warn};

impl Hub {
    /// A module transport identified itself.
    pub fn add_module(&mut self, name: &str) {
        if self.modules.contains_key(name) {
            warn!(module = %name, "Module reconnected, dropping previous session");
            self.remove_module(name);
        }

        let module = ModuleProxy::new(name);
        module.request_icon();
        module.enumerate_classes();
        module.enumerate_components();
        self.modules.insert(name.to_string(), module);

        self.timers.arm(
            TimerKey::InstancePoll(name.to_string()),
            self.config.instance_poll_interval,
        );
        MODULES_CONNECTED.set(self.modules.len() as i64);
        info!(module = %name, "Module connected");
        self.publish(HubEvent::ModuleConnected {
            module: name.to_string(),
        });
        self.flush();
    }

    /// A module transport went away.
    pub fn remove_module(&mut self, name: &str) {
        let Some(module) = self.modules.remove(name) else {
            return;
        };
        self.timers.cancel(&TimerKey::InstancePoll(name.to_string()));

        for edge in self.links.edges_touching(name, None) {
            self.unlink_edge(&edge);
        }
        self.update_link_gauge();

        let mut gone: Vec<String> = self
            .components_by_name
            .iter()
            .filter(|(_, live)| live.module == name)
            .map(|(component, _)| component.clone())
            .collect();
        gone.sort();
        for component in gone {
            self.components_by_name.remove(&component);
            self.publish(HubEvent::ComponentKilled {
                module: name.to_string(),
                component,
            });
        }
        self.pending_creates.retain(|(m, _), _| m != name);
        self.pending_deletes.retain(|(m, _)| m != name);

        MODULES_CONNECTED.set(self.modules.len() as i64);
        info!(module = %name, components = module.components().count(), "Module removed");
        self.publish(HubEvent::ModuleRemoved {
            module: name.to_string(),
        });

        self.check_current_scheme_components();
    }

    /// Handle one inbound transport frame.
    pub fn receive_frame(&mut self, module: &str, frame: &[u8]) {
        self.traffic.record_received(frame.len());
        let Some(proxy) = self.modules.get_mut(module) else {
            debug!(module = %module, "Frame from unknown module discarded");
            return;
        };
        match proxy.receive_frame(frame) {
            Ok(events) => {
                for event in events {
                    self.handle_module_event(module, event);
                }
            }
            Err(e) => debug!(module = %module, error = %e, "Malformed frame discarded"),
        }
        self.flush();
    }

    fn handle_module_event(&mut self, module: &str, event: ModuleEvent) {
        match event {
            ModuleEvent::NewComponent => {
                let id = self.allocate_component_id();
                if let Some(proxy) = self.modules.get_mut(module) {
                    proxy.assign_component_id(id);
                }
            }
            ModuleEvent::ComponentAdded(id) => {
                debug!(module = %module, component_id = id, "Component negotiating");
            }
            ModuleEvent::ComponentReady(id) => self.on_component_ready(module, id),
            ModuleEvent::ComponentInfoChanged(id) => self.on_component_info_changed(module, id),
            ModuleEvent::ComponentKilled { id, name } => self.on_component_killed(module, id, name),
            ModuleEvent::Ready => self.on_module_ready(module),
            ModuleEvent::Message { text, component } => {
                self.publish(HubEvent::ModuleMessage {
                    module: module.to_string(),
                    component,
                    text,
                });
            }
            ModuleEvent::ObjectReceived { component, oid } => {
                self.forward(&ObjectAddr::new(module, component, oid), Trigger::Received);
            }
            ModuleEvent::ObjectChanged { component, oid } => {
                self.forward(&ObjectAddr::new(module, component, oid), Trigger::Changed);
            }
        }
    }

    fn on_component_ready(&mut self, module: &str, id: u16) {
        let Some(component) = self.modules.get(module).and_then(|m| m.component(id)) else {
            return;
        };
        let name = component.name().to_string();
        let type_name = component.type_name().to_string();
        if let Err(e) = self
            .configs
            .write_component(module, &type_name, &component.info_json())
        {
            warn!(module = %module, class = %type_name, error = %e, "Failed to write component config");
        }

        self.components_by_name.insert(
            name.clone(),
            LiveComponent {
                module: module.to_string(),
                id,
            },
        );
        let key = (module.to_string(), name.to_lowercase());
        if let Some(outstanding) = self.pending_creates.get_mut(&key) {
            *outstanding -= 1;
            if *outstanding == 0 {
                self.pending_creates.remove(&key);
            }
        }

        info!(module = %module, component = %name, class = %type_name, "Component added");
        self.publish(HubEvent::ComponentAdded {
            module: module.to_string(),
            component: name.clone(),
            type_name,
        });

        self.reload_component_settings(&name);
        if self.enabled {
            self.link_component(&name);
        }
    }

    fn on_component_info_changed(&mut self, module: &str, id: u16) {
        let Some(name) = self
            .modules
            .get(module)
            .and_then(|m| m.component(id))
            .map(|c| c.name().to_string())
        else {
            return;
        };
        let previous = self
            .components_by_name
            .iter()
            .find(|(_, live)| live.module == module && live.id == id)
            .map(|(n, _)| n.clone());

        match previous {
            Some(old) if old != name => {
                self.components_by_name.remove(&old);
                self.components_by_name.insert(
                    name.clone(),
                    LiveComponent {
                        module: module.to_string(),
                        id,
                    },
                );
                info!(module = %module, from = %old, to = %name, "Component renamed");
                self.publish(HubEvent::ComponentRenamed {
                    module: module.to_string(),
                    from: old,
                    to: name,
                });
            }
            _ => {
                debug!(module = %module, component = %name, "Component changed");
                self.publish(HubEvent::ComponentChanged {
                    module: module.to_string(),
                    component: name,
                });
            }
        }
    }

    fn on_component_killed(&mut self, module: &str, id: u16, name: String) {
        let live = LiveComponent {
            module: module.to_string(),
            id,
        };
        if self.components_by_name.get(&name) == Some(&live) {
            self.components_by_name.remove(&name);
        }
        self.pending_deletes.remove(&(module.to_string(), id));

        for edge in self.links.edges_touching(module, Some(id)) {
            self.unlink_edge(&edge);
        }
        self.update_link_gauge();

        self.publish(HubEvent::ComponentKilled {
            module: module.to_string(),
            component: name,
        });
    }

    /// Every class prototype of the module is known.
    ///
    /// The first readiness of a module without cached configs writes them,
    /// and a cold module the scheme does not need is stopped again.
    fn on_module_ready(&mut self, module: &str) {
        self.publish(HubEvent::ModuleReady {
            module: module.to_string(),
        });

        if !self.configs.module_exists(module) {
            self.write_module_config(module);
            let needed = self
                .scheme
                .as_ref()
                .is_some_and(|s| s.components().iter().any(|c| c.module == module));
            if self.loader.start_type(module) == StartType::Cold && !needed {
                if let Err(e) = self.loader.stop_module(module) {
                    warn!(module = %module, error = %e, "Failed to stop module");
                }
            }
        }

        self.forget_pending_requests();
        self.check_current_scheme_components();
    }

    /// Write the module icon and every class prototype to the config cache.
    fn write_module_config(&mut self, name: &str) {
        let Some(module) = self.modules.get(name) else {
            return;
        };
        if !module.icon().is_empty() {
            if let Err(e) = self.configs.write_icon(name, module.icon()) {
                warn!(module = %name, error = %e, "Failed to write module icon");
            }
        }
        let mut written = 0usize;
        for proto in module.prototypes() {
            match self
                .configs
                .write_component(name, proto.type_name(), &proto.info_json())
            {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(module = %name, class = %proto.type_name(), error = %e, "Failed to write component config");
                }
            }
        }
        info!(module = %name, classes = written, "Module config written");
        self.publish(HubEvent::ConfigWritten {
            module: name.to_string(),
        });
    }

    /// Throw away a module's cached configs and write them again, starting
    /// the module if it is not connected.
    pub fn refresh_configs(&mut self, module: &str) -> Result<(), HubError> {
        self.configs.remove_module(module)?;
        if self.modules.contains_key(module) {
            self.write_module_config(module);
            Ok(())
        } else if self.loader.is_known(module) {
            self.loader.start_module(module)?;
            Ok(())
        } else {
            Err(HubError::UnknownModule(module.to_string()))
        }
    }

    /// Cached configs as `{module: {type: info}}`.
    pub fn read_configurations(&self) -> Result<Json, HubError> {
        let all = self.configs.read_all()?;
        let doc: Map<String, Json> = all
            .into_iter()
            .map(|(module, classes)| (module, Json::Object(classes.into_iter().collect())))
            .collect();
        Ok(Json::Object(doc))
    }

    /// Change a module's start type and persist it.
    pub fn set_start_type(&mut self, module: &str, start_type: StartType) -> Result<(), HubError> {
        self.loader.set_start_type(module, start_type)?;
        Ok(())
    }

    // =========================================================================
    // TIMERS
    // =========================================================================

    pub fn on_timer(&mut self, key: &TimerKey) {
        match key {
            TimerKey::InstancePoll(module) => {
                if let Some(proxy) = self.modules.get(module) {
                    proxy.enumerate_components();
                }
            }
            TimerKey::PublisherPoll(addr) | TimerKey::AutoRequest(addr) => {
                if let Some(component) = self
                    .modules
                    .get(&addr.module)
                    .and_then(|m| m.component(addr.component))
                {
                    component.request_object(addr.object);
                }
            }
            TimerKey::ProcessReap => {
                let exited = self.loader.reap();
                if !exited.is_empty() {
                    self.forget_pending_requests();
                    self.check_current_scheme_components();
                }
            }
            TimerKey::TrafficSample => self.traffic.sample(Instant::now()),
        }
        self.flush();
    }
}
