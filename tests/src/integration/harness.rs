//! Shared hub harness for the scenarios.

use hub_runtime::test_utils::{
    install_module, InMemoryConfigCache, RecordingFrames, RecordingLauncher, RecordingTimers,
    SimObject, SimulatedModule,
};
use hub_runtime::{Hub, HubConfig, HubPorts};
use onb_protocol::domain::svc;
use onb_protocol::{Packet, ValueType};
use shared_bus::{EventFilter, InMemoryEventBus, Subscription};
use std::sync::Arc;
use tempfile::TempDir;

pub const TEMP_SENSOR: u32 = 0x0000_0101;
pub const LOGGER: u32 = 0x0000_0202;

pub fn device_module() -> SimulatedModule {
    SimulatedModule::new().with_class(
        TEMP_SENSOR,
        "TempSensor",
        vec![SimObject::output(0, "value", ValueType::Int)],
    )
}

pub fn log_module() -> SimulatedModule {
    SimulatedModule::new().with_class(
        LOGGER,
        "Logger",
        vec![
            SimObject::input(0, "input", ValueType::Int),
            SimObject::input(1, "label", ValueType::String),
        ],
    )
}

pub struct Harness {
    pub dir: TempDir,
    pub hub: Hub,
    pub timers: RecordingTimers,
    pub frames: RecordingFrames,
    pub configs: InMemoryConfigCache,
    pub launcher: RecordingLauncher,
    pub bus: Arc<InMemoryEventBus>,
}

impl Harness {
    /// A hub over a fresh root folder. `prepare` may install modules and
    /// write files before the hub starts.
    pub fn start(prepare: impl FnOnce(&mut HubConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = HubConfig::with_root(dir.path());
        prepare(&mut config);

        let timers = RecordingTimers::new();
        let frames = RecordingFrames::new();
        let configs = InMemoryConfigCache::new();
        let launcher = RecordingLauncher::new();
        let bus = Arc::new(InMemoryEventBus::new());
        let ports = HubPorts {
            timers: Box::new(timers.clone()),
            frames: Box::new(frames.clone()),
            configs: Box::new(configs.clone()),
            launcher: Box::new(launcher.clone()),
        };
        let mut hub = Hub::new(config, ports, bus.clone());
        hub.start().unwrap();

        Self {
            dir,
            hub,
            timers,
            frames,
            configs,
            launcher,
            bus,
        }
    }

    pub fn install(config: &HubConfig, modules: &[&str]) {
        for name in modules {
            install_module(&config.modules_dir, name).unwrap();
        }
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.bus.subscribe(filter)
    }

    pub fn connect(&mut self, module: &str, sim: &SimulatedModule) {
        self.hub.add_module(module);
        for frame in sim.class_frames() {
            self.hub.receive_frame(module, &frame);
        }
    }

    /// Announce a component and answer its info requests; returns its id.
    pub fn spawn(&mut self, module: &str, sim: &SimulatedModule, type_name: &str, name: &str) -> u16 {
        let _ = self.frames.take_for(module);
        self.hub.receive_frame(module, &SimulatedModule::hello());
        let welcome = self
            .frames
            .take_for(module)
            .into_iter()
            .find(|p| p.header().svc && p.header().object_id == svc::WELCOME)
            .unwrap();
        let id = u16::from_le_bytes([welcome.payload()[0], welcome.payload()[1]]);
        for frame in sim.component_frames(id, type_name, name) {
            self.hub.receive_frame(module, &frame);
        }
        id
    }

    /// Service packets with object id `oid` sent to `module` since the last
    /// call.
    pub fn sent(&self, module: &str, oid: u8) -> Vec<Packet> {
        self.frames
            .take_for(module)
            .into_iter()
            .filter(|p| p.header().svc && p.header().object_id == oid)
            .collect()
    }
}
