//! # Hub
//!
//! Single owner of everything live: connected modules, the component name
//! index, the loaded scheme, the link engine and the global enable flag.
//! Every handler runs on the runtime's one control flow; nothing here locks.
//!
//! ## Triggers
//!
//! ```text
//!  transport frame ──▶ receive_frame ──▶ ModuleEvent ──┬─▶ ids, index, settings, links
//!                                                      └─▶ module Ready ─┐
//!  scheme operation ──▶ apply_scheme_changes ──────────────────────────┤
//!  process exit (reap) ─────────────────────────────────────────────────┤
//!  module disconnect ──▶ remove_module ─────────────────────────────────┤
//!                                                                       ▼
//!                                                 check_current_scheme_components
//! ```
//!
//! After each handler the module sinks are flushed onto the [`FrameSink`].

mod links;
mod modules;
mod reconcile;
mod scheme_ops;

#[cfg(test)]
mod tests;

use crate::config::HubConfig;
use crate::loader::{Loader, LoaderError};
use crate::ports::{ConfigCache, FrameSink, ProcessLauncher, TimerKey, TimerService};
use hub_telemetry::TrafficMeter;
use onb_protocol::{ComponentProxy, LinkEngine, ModuleError, ModuleProxy, ObjectAddr};
use scheme_store::{Scheme, SchemeError};
use shared_bus::{EventPublisher, HubEvent};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Hub operation failures. Reconciliation itself never fails; these come
/// from explicit scheme, loader and config requests.
#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Scheme(#[from] SchemeError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Component is not live: {0}")]
    ComponentNotLive(String),

    #[error("No scheme loaded")]
    NoScheme,

    #[error("I/O error on {path:?}: {message}")]
    Io { path: PathBuf, message: String },
}

/// The outside world as seen by the hub.
pub struct HubPorts {
    pub timers: Box<dyn TimerService>,
    pub frames: Box<dyn FrameSink>,
    pub configs: Box<dyn ConfigCache>,
    pub launcher: Box<dyn ProcessLauncher>,
}

/// Where a named live component lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveComponent {
    pub module: String,
    pub id: u16,
}

pub struct Hub {
    config: HubConfig,
    modules: BTreeMap<String, ModuleProxy>,
    components_by_name: HashMap<String, LiveComponent>,
    scheme: Option<Scheme>,
    enabled: bool,
    links: LinkEngine,
    /// Rate-limited publishers and the poll period each subscriber asks for.
    publisher_polls: BTreeMap<ObjectAddr, BTreeMap<ObjectAddr, u32>>,
    next_component_id: u16,
    /// Create requests sent but not yet answered by a ready component,
    /// keyed by module and lowercase name.
    pending_creates: HashMap<(String, String), usize>,
    /// Delete requests sent but not yet confirmed by a kill.
    pending_deletes: HashSet<(String, u16)>,
    loader: Loader,
    timers: Box<dyn TimerService>,
    frames: Box<dyn FrameSink>,
    configs: Box<dyn ConfigCache>,
    events: Arc<dyn EventPublisher>,
    traffic: TrafficMeter,
}

impl Hub {
    pub fn new(config: HubConfig, ports: HubPorts, events: Arc<dyn EventPublisher>) -> Self {
        let loader = Loader::new(&config, ports.launcher);
        Self {
            config,
            modules: BTreeMap::new(),
            components_by_name: HashMap::new(),
            scheme: None,
            enabled: false,
            links: LinkEngine::new(),
            publisher_polls: BTreeMap::new(),
            next_component_id: 1,
            pending_creates: HashMap::new(),
            pending_deletes: HashSet::new(),
            loader,
            timers: ports.timers,
            frames: ports.frames,
            configs: ports.configs,
            events,
            traffic: TrafficMeter::new(),
        }
    }

    /// Discover modules, start the hot ones, arm the housekeeping timers and
    /// load the startup scheme.
    pub fn start(&mut self) -> Result<(), HubError> {
        self.loader.discover()?;
        self.loader.start_hot_modules();

        self.timers
            .arm(TimerKey::ProcessReap, self.config.process_reap_interval);
        self.timers
            .arm(TimerKey::TrafficSample, self.config.traffic_sample_interval);

        if let Some(path) = self.config.scheme_path.clone() {
            self.load_scheme(&path)?;
        }
        if self.config.enabled_on_start {
            self.set_enabled(true);
        }
        info!(
            modules = self.loader.module_names().count(),
            enabled = self.enabled,
            "Hub started"
        );
        Ok(())
    }

    /// Unlink everything, stop every timer and every child process.
    pub fn shutdown(&mut self) {
        self.unlink_all();
        self.flush();

        self.timers.cancel(&TimerKey::ProcessReap);
        self.timers.cancel(&TimerKey::TrafficSample);
        for name in self.modules.keys() {
            self.timers.cancel(&TimerKey::InstancePoll(name.clone()));
        }
        self.loader.shutdown();
        info!("Hub stopped");
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleProxy> {
        self.modules.get(name)
    }

    /// Case-insensitive module lookup.
    fn module_name_like(&self, name: &str) -> Option<String> {
        self.modules
            .keys()
            .find(|m| m.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleProxy> {
        self.modules.values()
    }

    /// Ready component by name.
    #[must_use]
    pub fn live_component(&self, name: &str) -> Option<&ComponentProxy> {
        let live = self.components_by_name.get(name)?;
        self.modules.get(&live.module)?.component(live.id)
    }

    #[must_use]
    pub fn locate(&self, name: &str) -> Option<&LiveComponent> {
        self.components_by_name.get(name)
    }

    /// Names of every indexed live component, sorted.
    #[must_use]
    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.components_by_name.keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn links(&self) -> &LinkEngine {
        &self.links
    }

    #[must_use]
    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    #[must_use]
    pub fn traffic(&self) -> &TrafficMeter {
        &self.traffic
    }

    // =========================================================================
    // OUTPUT
    // =========================================================================

    /// Hand every queued packet to the transport, module by module.
    pub fn flush(&mut self) {
        for (name, module) in &self.modules {
            for packet in module.sink().drain() {
                let frame = packet.encode();
                self.traffic.record_sent(frame.len());
                if !self.frames.send(name, frame) {
                    debug!(module = %name, "No transport for module, frame dropped");
                }
            }
        }
    }

    fn publish(&self, event: HubEvent) {
        self.events.publish(event);
    }

    fn allocate_component_id(&mut self) -> u16 {
        let id = self.next_component_id;
        // id 0 addresses the module itself
        self.next_component_id = self.next_component_id.checked_add(1).unwrap_or(1);
        id
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .field("components", &self.components_by_name.len())
            .field("enabled", &self.enabled)
            .field("links", &self.links.len())
            .finish_non_exhaustive()
    }
}
