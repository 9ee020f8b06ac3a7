//! # Hub Tests
//!
//! Modules are simulated from packets; processes, timers, transport and the
//! config cache are recording doubles.

use super::*;
use crate::test_utils::{
    install_module, InMemoryConfigCache, RecordingFrames, RecordingLauncher, RecordingTimers,
    SimObject, SimulatedModule,
};
use onb_protocol::domain::svc;
use onb_protocol::{Header, Packet, ValueType};
use scheme_store::{ComponentConnection, ComponentInfo};
use serde_json::json;
use shared_bus::{EventFilter, InMemoryEventBus, Subscription};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const TEMP_SENSOR: u32 = 0x0000_0101;
const LOGGER: u32 = 0x0000_0202;
const DIMMER: u32 = 0x0000_0303;

fn device_module() -> SimulatedModule {
    SimulatedModule::new().with_class(
        TEMP_SENSOR,
        "TempSensor",
        vec![SimObject::output(0, "value", ValueType::Int).with_rmip(100)],
    )
}

fn log_module() -> SimulatedModule {
    SimulatedModule::new().with_class(
        LOGGER,
        "Logger",
        vec![SimObject::input(0, "input", ValueType::Int)],
    )
}

struct Fixture {
    dir: TempDir,
    hub: Hub,
    timers: RecordingTimers,
    frames: RecordingFrames,
    configs: InMemoryConfigCache,
    launcher: RecordingLauncher,
    events: Subscription,
    _bus: Arc<InMemoryEventBus>,
}

impl Fixture {
    fn new(installed: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let config = HubConfig::with_root(dir.path());
        for name in installed {
            install_module(&config.modules_dir, name).unwrap();
        }

        let timers = RecordingTimers::new();
        let frames = RecordingFrames::new();
        let configs = InMemoryConfigCache::new();
        let launcher = RecordingLauncher::new();
        let bus = Arc::new(InMemoryEventBus::new());
        let events = bus.subscribe(EventFilter::all());

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
            events,
            _bus: bus,
        }
    }

    /// Connect a module and answer its class enumeration.
    fn connect(&mut self, module: &str, sim: &SimulatedModule) {
        self.hub.add_module(module);
        for frame in sim.class_frames() {
            self.hub.receive_frame(module, &frame);
        }
    }

    /// Announce a new component and answer the hub's info requests.
    /// Returns the id the hub assigned.
    fn spawn(&mut self, module: &str, sim: &SimulatedModule, type_name: &str, name: &str) -> u16 {
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

    fn sent(&self, module: &str, oid: u8) -> Vec<Packet> {
        self.frames
            .take_for(module)
            .into_iter()
            .filter(|p| p.header().svc && p.header().object_id == oid)
            .collect()
    }
}

fn sensor_and_logger_scheme(rmip: u32) -> Scheme {
    let mut scheme = Scheme::new();
    scheme
        .add_component(ComponentInfo::new("Sensor1", "TempSensor", "DeviceMod"))
        .unwrap();
    scheme
        .add_component(ComponentInfo::new("Logger1", "Logger", "LogMod"))
        .unwrap();
    scheme.add_connection(ComponentConnection::new(
        ("Sensor1", "value"),
        ("Logger1", "input"),
        rmip,
    ));
    scheme
}

/// Sensor1 and Logger1 live, linked through a 1000 ms connection.
fn linked_fixture() -> (Fixture, u16, u16) {
    let mut fx = Fixture::new(&[]);
    fx.hub.set_scheme(Some(sensor_and_logger_scheme(1000)));
    let device = device_module();
    let log = log_module();
    fx.connect("DeviceMod", &device);
    fx.connect("LogMod", &log);
    let sensor = fx.spawn("DeviceMod", &device, "TempSensor", "Sensor1");
    let logger = fx.spawn("LogMod", &log, "Logger", "Logger1");
    fx.hub.set_enabled(true);
    (fx, sensor, logger)
}

// =============================================================================
// MODULES
// =============================================================================

#[test]
fn test_add_module_starts_discovery() {
    let mut fx = Fixture::new(&[]);
    fx.hub.add_module("DeviceMod");

    let ids: Vec<u8> = fx
        .frames
        .take_for("DeviceMod")
        .iter()
        .map(|p| p.header().object_id)
        .collect();
    assert_eq!(ids, vec![svc::ICON, svc::POLL_CLASSES, svc::POLL_NODES]);
    assert_eq!(
        fx.timers
            .period(&TimerKey::InstancePoll("DeviceMod".into())),
        Some(Duration::from_millis(200))
    );
    assert!(fx.events.drain().contains(&HubEvent::ModuleConnected {
        module: "DeviceMod".into()
    }));
}

#[test]
fn test_instance_poll_enumerates_components() {
    let mut fx = Fixture::new(&[]);
    fx.hub.add_module("DeviceMod");
    let _ = fx.frames.take();

    fx.hub.on_timer(&TimerKey::InstancePoll("DeviceMod".into()));
    let packets = fx.frames.take_for("DeviceMod");
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].header().object_id, svc::POLL_NODES);
}

#[test]
fn test_component_ids_come_from_one_counter() {
    let mut fx = Fixture::new(&[]);
    let device = device_module();
    let log = log_module();
    fx.connect("DeviceMod", &device);
    fx.connect("LogMod", &log);

    assert_eq!(fx.spawn("DeviceMod", &device, "TempSensor", "Sensor1"), 1);
    assert_eq!(fx.spawn("LogMod", &log, "Logger", "Logger1"), 2);
    assert_eq!(fx.hub.locate("Logger1").unwrap().module, "LogMod");
}

#[test]
fn test_component_ready_is_indexed_and_cached() {
    let mut fx = Fixture::new(&[]);
    fx.hub.set_scheme(Some(Scheme::new()));
    let device = device_module();
    fx.connect("DeviceMod", &device);
    let _ = fx.events.drain();

    let id = fx.spawn("DeviceMod", &device, "TempSensor", "Sensor1");
    assert_eq!(
        fx.hub.locate("Sensor1"),
        Some(&LiveComponent {
            module: "DeviceMod".into(),
            id
        })
    );
    assert!(fx.events.drain().contains(&HubEvent::ComponentAdded {
        module: "DeviceMod".into(),
        component: "Sensor1".into(),
        type_name: "TempSensor".into(),
    }));
    let cached = fx.configs.read_all().unwrap();
    assert_eq!(cached["DeviceMod"]["TempSensor"]["type"], "TempSensor");
}

#[test]
fn test_module_message_is_published() {
    let mut fx = Fixture::new(&[]);
    fx.hub.add_module("DeviceMod");
    let _ = fx.events.drain();

    let frame = Packet::new(Header::service(svc::MESSAGE, 0), b"calibrated".to_vec()).encode();
    fx.hub.receive_frame("DeviceMod", &frame);
    assert_eq!(
        fx.events.drain(),
        vec![HubEvent::ModuleMessage {
            module: "DeviceMod".into(),
            component: None,
            text: "calibrated".into(),
        }]
    );
}

#[test]
fn test_malformed_frame_is_discarded() {
    let mut fx = Fixture::new(&[]);
    fx.hub.add_module("DeviceMod");
    let _ = fx.events.drain();

    fx.hub.receive_frame("DeviceMod", &[0x01]);
    fx.hub.receive_frame("Unknown", &SimulatedModule::hello());
    assert!(fx.events.drain().is_empty());
    assert_eq!(fx.hub.traffic().packets_received(), 2);
}

#[test]
fn test_remove_module_forgets_its_components() {
    let mut fx = Fixture::new(&[]);
    fx.hub.set_scheme(Some(Scheme::new()));
    let device = device_module();
    fx.connect("DeviceMod", &device);
    fx.spawn("DeviceMod", &device, "TempSensor", "Stray");
    let _ = fx.events.drain();

    fx.hub.remove_module("DeviceMod");
    assert!(fx.hub.module("DeviceMod").is_none());
    assert!(fx.hub.locate("Stray").is_none());
    assert!(!fx
        .timers
        .is_armed(&TimerKey::InstancePoll("DeviceMod".into())));
    let events = fx.events.drain();
    assert!(events.contains(&HubEvent::ComponentKilled {
        module: "DeviceMod".into(),
        component: "Stray".into(),
    }));
    assert!(events.contains(&HubEvent::ModuleRemoved {
        module: "DeviceMod".into()
    }));
}

// =============================================================================
// RECONCILIATION
// =============================================================================

#[test]
fn test_cold_module_started_and_component_created_once() {
    let mut fx = Fixture::new(&["DeviceMod"]);
    let mut scheme = Scheme::new();
    scheme
        .add_component(ComponentInfo::new("Sensor1", "TempSensor", "DeviceMod"))
        .unwrap();
    fx.hub.set_scheme(Some(scheme));
    assert_eq!(fx.launcher.spawned(), vec!["DeviceMod".to_string()]);

    fx.connect("DeviceMod", &device_module());
    let creates = fx.sent("DeviceMod", svc::CREATE);
    assert_eq!(creates.len(), 1);
    let mut expected = TEMP_SENSOR.to_le_bytes().to_vec();
    expected.extend_from_slice(b"Sensor1");
    assert_eq!(creates[0].payload(), expected.as_slice());

    // the first readiness cached the configs; the module is still needed
    assert!(fx.configs.module_exists("DeviceMod"));
    assert!(fx.launcher.killed().is_empty());

    fx.hub.check_current_scheme_components();
    assert!(fx.sent("DeviceMod", svc::CREATE).is_empty());
    assert_eq!(fx.launcher.spawned().len(), 1);
}

#[test]
fn test_reconciliation_is_idempotent() {
    let mut fx = Fixture::new(&[]);
    fx.hub.set_scheme(Some(Scheme::new()));
    let device = device_module();
    fx.connect("DeviceMod", &device);
    let stray = fx.spawn("DeviceMod", &device, "TempSensor", "Stray");

    fx.hub.check_current_scheme_components();
    let kills = fx.sent("DeviceMod", svc::KILL);
    assert_eq!(kills.len(), 1);
    assert_eq!(kills[0].payload(), stray.to_le_bytes());

    fx.hub.check_current_scheme_components();
    assert!(fx.sent("DeviceMod", svc::KILL).is_empty());

    fx.hub
        .receive_frame("DeviceMod", &SimulatedModule::kill(stray));
    assert!(fx.hub.locate("Stray").is_none());
    assert!(fx.events.drain().contains(&HubEvent::ComponentKilled {
        module: "DeviceMod".into(),
        component: "Stray".into(),
    }));
}

#[test]
fn test_dropped_create_is_sent_again_after_scheme_change() {
    let mut fx = Fixture::new(&[]);
    let mut scheme = Scheme::new();
    scheme
        .add_component(ComponentInfo::new("Sensor1", "TempSensor", "DeviceMod"))
        .unwrap();
    fx.hub.set_scheme(Some(scheme));
    fx.connect("DeviceMod", &device_module());
    assert_eq!(fx.sent("DeviceMod", svc::CREATE).len(), 1);

    // the module never answers; an unrelated pass does not repeat it
    fx.hub.check_current_scheme_components();
    assert!(fx.sent("DeviceMod", svc::CREATE).is_empty());

    let added = fx
        .hub
        .create_component_in_scheme("TempSensor", "DeviceMod")
        .unwrap();
    let creates = fx.sent("DeviceMod", svc::CREATE);
    let named = |name: &str| {
        let mut payload = TEMP_SENSOR.to_le_bytes().to_vec();
        payload.extend_from_slice(name.as_bytes());
        creates.iter().filter(|p| p.payload() == payload.as_slice()).count()
    };
    assert_eq!(named("Sensor1"), 1);
    assert_eq!(named(&added), 1);
}

#[test]
fn test_dropped_kill_is_sent_again_after_scheme_change() {
    let mut fx = Fixture::new(&[]);
    fx.hub.set_scheme(Some(Scheme::new()));
    let device = device_module();
    fx.connect("DeviceMod", &device);
    let stray = fx.spawn("DeviceMod", &device, "TempSensor", "Stray");

    fx.hub.check_current_scheme_components();
    assert_eq!(fx.sent("DeviceMod", svc::KILL).len(), 1);

    // no kill comes back; the next scheme change asks again
    fx.hub
        .edit_scheme(|scheme| scheme.add_component(ComponentInfo::new("Other1", "Other", "OtherMod")))
        .unwrap();
    let kills = fx.sent("DeviceMod", svc::KILL);
    assert_eq!(kills.len(), 1);
    assert_eq!(kills[0].payload(), stray.to_le_bytes());
}

#[test]
fn test_duplicate_entries_request_exactly_one_create() {
    let mut fx = Fixture::new(&[]);
    let sim = SimulatedModule::new().with_class(0x55, "TypeA", Vec::new());
    fx.connect("ModB", &sim);
    fx.spawn("ModB", &sim, "TypeA", "X");
    let _ = fx.frames.take();

    let doc = json!({
        "components": [
            { "type": "TypeA", "name": "X", "module": "ModB" },
            { "type": "TypeA", "name": "X", "module": "ModB" }
        ]
    });
    fx.hub.set_scheme(Some(Scheme::from_json(&doc)));
    let packets = fx.frames.take_for("ModB");
    let count = |oid| {
        packets
            .iter()
            .filter(|p| p.header().svc && p.header().object_id == oid)
            .count()
    };
    assert_eq!(count(svc::KILL), 0);
    assert_eq!(count(svc::CREATE), 1);

    fx.hub.check_current_scheme_components();
    assert!(fx.sent("ModB", svc::CREATE).is_empty());
}

#[test]
fn test_no_scheme_deletes_everything() {
    let mut fx = Fixture::new(&[]);
    fx.hub.set_scheme(Some(Scheme::new()));
    let device = device_module();
    fx.connect("DeviceMod", &device);
    fx.spawn("DeviceMod", &device, "TempSensor", "Sensor1");
    fx.spawn("DeviceMod", &device, "TempSensor", "Sensor2");
    let _ = fx.frames.take();

    fx.hub.set_scheme(None);
    assert_eq!(fx.sent("DeviceMod", svc::KILL).len(), 2);
}

#[test]
fn test_first_ready_caches_configs_and_stops_unneeded_cold_module() {
    let mut fx = Fixture::new(&["DeviceMod"]);
    fx.hub.set_scheme(Some(Scheme::new()));
    fx.hub.refresh_configs("DeviceMod").unwrap();
    assert_eq!(fx.launcher.spawned(), vec!["DeviceMod".to_string()]);

    fx.connect("DeviceMod", &device_module());
    assert_eq!(fx.launcher.killed(), vec!["DeviceMod".to_string()]);
    assert!(!fx.hub.loader().is_running("DeviceMod"));

    let configs = fx.hub.read_configurations().unwrap();
    assert_eq!(configs["DeviceMod"]["TempSensor"]["classID"], TEMP_SENSOR.to_string());
    assert!(fx.events.drain().contains(&HubEvent::ConfigWritten {
        module: "DeviceMod".into()
    }));
}

#[test]
fn test_refresh_configs_of_unknown_module_fails() {
    let mut fx = Fixture::new(&[]);
    assert!(matches!(
        fx.hub.refresh_configs("Nope"),
        Err(HubError::UnknownModule(_))
    ));
}

#[test]
fn test_process_exit_triggers_restart() {
    let mut fx = Fixture::new(&["DeviceMod"]);
    let mut scheme = Scheme::new();
    scheme
        .add_component(ComponentInfo::new("Sensor1", "TempSensor", "DeviceMod"))
        .unwrap();
    fx.hub.set_scheme(Some(scheme));
    assert_eq!(fx.launcher.spawned().len(), 1);

    fx.launcher.exit("DeviceMod", 1);
    fx.hub.on_timer(&TimerKey::ProcessReap);
    assert_eq!(fx.launcher.spawned().len(), 2);
}

// =============================================================================
// LINKS
// =============================================================================

#[test]
fn test_enable_links_and_arms_publisher_poll() {
    let (fx, sensor, _logger) = linked_fixture();

    assert_eq!(fx.hub.links().len(), 1);
    let subscribes = fx.sent("DeviceMod", svc::SUBSCRIBE);
    assert_eq!(subscribes.len(), 1);
    let mut expected = 1000i32.to_le_bytes().to_vec();
    expected.push(0);
    assert_eq!(subscribes[0].payload(), expected.as_slice());

    let poll = TimerKey::PublisherPoll(ObjectAddr::new("DeviceMod", sensor, 0));
    assert_eq!(fx.timers.period(&poll), Some(Duration::from_millis(1000)));
}

#[test]
fn test_disable_then_enable_rearms_poll() {
    let (mut fx, sensor, _logger) = linked_fixture();
    let poll = TimerKey::PublisherPoll(ObjectAddr::new("DeviceMod", sensor, 0));
    let _ = fx.frames.take();

    fx.hub.set_enabled(false);
    assert!(fx.hub.links().is_empty());
    assert!(!fx.timers.is_armed(&poll));
    let unsubscribes = fx.sent("DeviceMod", svc::UNSUBSCRIBE);
    assert_eq!(unsubscribes.len(), 1);
    assert_eq!(unsubscribes[0].payload(), [0]);

    fx.hub.set_enabled(true);
    assert_eq!(fx.hub.links().len(), 1);
    assert_eq!(fx.timers.period(&poll), Some(Duration::from_millis(1000)));
    assert!(fx.events.drain().contains(&HubEvent::EnableChanged { enabled: true }));
}

#[test]
fn test_publisher_rmip_used_without_connection_rmip() {
    let mut fx = Fixture::new(&[]);
    fx.hub.set_scheme(Some(sensor_and_logger_scheme(0)));
    let device = device_module();
    let log = log_module();
    fx.connect("DeviceMod", &device);
    fx.connect("LogMod", &log);
    let sensor = fx.spawn("DeviceMod", &device, "TempSensor", "Sensor1");
    fx.spawn("LogMod", &log, "Logger", "Logger1");
    fx.hub.set_enabled(true);

    let poll = TimerKey::PublisherPoll(ObjectAddr::new("DeviceMod", sensor, 0));
    assert_eq!(fx.timers.period(&poll), Some(Duration::from_millis(100)));
}

#[test]
fn test_value_change_forwarded_to_subscriber() {
    let (mut fx, sensor, logger) = linked_fixture();
    let _ = fx.frames.take();

    fx.hub
        .receive_frame("DeviceMod", &SimulatedModule::data(sensor, 0, &21i32.to_le_bytes()));
    let forwarded: Vec<Packet> = fx
        .frames
        .take_for("LogMod")
        .into_iter()
        .filter(|p| !p.header().svc)
        .collect();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].header().component_id, logger);
    assert_eq!(forwarded[0].header().object_id, 0);
    assert_eq!(forwarded[0].payload(), 21i32.to_le_bytes());

    // same value again: received, not changed
    fx.hub
        .receive_frame("DeviceMod", &SimulatedModule::data(sensor, 0, &21i32.to_le_bytes()));
    assert!(fx.frames.take_for("LogMod").is_empty());
}

#[test]
fn test_publisher_poll_requests_value() {
    let (mut fx, sensor, _logger) = linked_fixture();
    let addr = ObjectAddr::new("DeviceMod", sensor, 0);
    let _ = fx.frames.take();

    fx.hub.on_timer(&TimerKey::PublisherPoll(addr));
    let packets = fx.frames.take_for("DeviceMod");
    assert_eq!(packets.len(), 1);
    assert!(!packets[0].header().svc);
    assert!(packets[0].payload().is_empty());
}

#[test]
fn test_disabled_connection_is_not_linked() {
    let (mut fx, _sensor, _logger) = linked_fixture();
    assert!(fx
        .hub
        .set_connection_enabled("Sensor1.value -> Logger1.input", false));
    assert!(fx.hub.links().is_empty());
}

#[test]
fn test_killed_subscriber_drops_link() {
    let (mut fx, _sensor, logger) = linked_fixture();
    fx.hub
        .receive_frame("LogMod", &SimulatedModule::kill(logger));
    assert!(fx.hub.links().is_empty());
}

// =============================================================================
// SCHEME OPERATIONS
// =============================================================================

#[test]
fn test_rename_tells_module_and_rewrites_scheme() {
    let (mut fx, sensor, _logger) = linked_fixture();
    let _ = fx.frames.take();
    let _ = fx.events.drain();

    fx.hub.rename_component("Sensor1", "Sensor2").unwrap();

    let scheme = fx.hub.scheme().unwrap();
    assert!(scheme.connection("Sensor2.value -> Logger1.input").is_some());
    assert!(scheme.connection("Sensor1.value -> Logger1.input").is_none());
    assert!(fx.hub.locate("Sensor1").is_none());
    assert_eq!(fx.hub.live_component("Sensor2").unwrap().name(), "Sensor2");
    assert_eq!(fx.hub.links().len(), 1);

    let packets = fx.frames.take_for("DeviceMod");
    let service = |oid| {
        packets
            .iter()
            .filter(|p| p.header().svc && p.header().object_id == oid)
            .collect::<Vec<_>>()
    };
    let names = service(svc::NAME);
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].header().component_id, sensor);
    assert_eq!(names[0].payload(), b"Sensor2");
    assert!(service(svc::KILL).is_empty());
    assert!(service(svc::CREATE).is_empty());

    let events = fx.events.drain();
    assert!(events.contains(&HubEvent::ComponentRenamed {
        module: "DeviceMod".into(),
        from: "Sensor1".into(),
        to: "Sensor2".into(),
    }));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, HubEvent::SchemeChanged { .. }))
            .count(),
        1
    );
}

#[test]
fn test_settings_pushed_on_ready_and_stored_back() {
    let mut fx = Fixture::new(&[]);
    let sim = SimulatedModule::new().with_class(
        DIMMER,
        "Dimmer",
        vec![SimObject::setting(0, "gain", ValueType::Int)],
    );
    let mut info = ComponentInfo::new("Dimmer1", "Dimmer", "LightMod");
    info.settings = json!({ "gain": { "value": 5 } })
        .as_object()
        .unwrap()
        .clone();
    let mut scheme = Scheme::new();
    scheme.add_component(info).unwrap();
    fx.hub.set_scheme(Some(scheme));
    fx.connect("LightMod", &sim);

    let id = fx.spawn("LightMod", &sim, "Dimmer", "Dimmer1");
    let data: Vec<Packet> = fx
        .frames
        .take_for("LightMod")
        .into_iter()
        .filter(|p| !p.header().svc)
        .collect();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].header().component_id, id);
    assert_eq!(data[0].payload(), 5i32.to_le_bytes());

    fx.hub
        .receive_frame("LightMod", &SimulatedModule::data(id, 0, &7i32.to_le_bytes()));
    fx.hub.store_component_settings("Dimmer1").unwrap();
    let stored = &fx.hub.scheme().unwrap().component("Dimmer1").unwrap().settings;
    assert_eq!(stored["gain"], json!({ "value": 7 }));
}

#[test]
fn test_store_settings_requires_live_component() {
    let mut fx = Fixture::new(&[]);
    assert!(matches!(
        fx.hub.store_component_settings("Ghost"),
        Err(HubError::ComponentNotLive(_))
    ));
}

#[test]
fn test_scheme_file_lifecycle() {
    let mut fx = Fixture::new(&[]);
    assert_eq!(
        fx.hub
            .create_component_in_scheme("TempSensor", "DeviceMod")
            .unwrap(),
        "TempSensor_1"
    );
    assert_eq!(
        fx.hub
            .create_component_in_scheme("TempSensor", "DeviceMod")
            .unwrap(),
        "TempSensor_2"
    );

    let path = fx.hub.save_scheme(Some(Path::new("plant"))).unwrap();
    assert_eq!(path, fx.dir.path().join("xoSchemes").join("plant.scheme"));
    assert!(path.exists());

    fx.hub.clear_scheme();
    assert!(fx.hub.scheme().unwrap().components().is_empty());

    fx.hub.load_scheme(Path::new("plant")).unwrap();
    assert_eq!(fx.hub.scheme().unwrap().components().len(), 2);
    fx.hub.remove_component_from_scheme("TempSensor_1").unwrap();
    assert!(fx.hub.reload_scheme().unwrap());
    assert_eq!(fx.hub.scheme().unwrap().components().len(), 2);

    fx.hub.set_enabled(true);
    fx.hub.delete_scheme(Path::new("plant")).unwrap();
    assert!(!path.exists());
    assert!(fx.hub.scheme().unwrap().components().is_empty());
    assert!(!fx.hub.is_enabled());
}

#[test]
fn test_load_scheme_disables_hub() {
    let mut fx = Fixture::new(&[]);
    fx.hub.create_component_in_scheme("TempSensor", "DeviceMod").unwrap();
    let path = fx.hub.save_scheme(Some(Path::new("plant"))).unwrap();
    fx.hub.set_enabled(true);

    fx.hub.load_scheme(&path).unwrap();
    assert!(!fx.hub.is_enabled());
}

#[test]
fn test_load_missing_scheme_keeps_current() {
    let mut fx = Fixture::new(&[]);
    fx.hub.create_component_in_scheme("TempSensor", "DeviceMod").unwrap();
    assert!(matches!(
        fx.hub.load_scheme(Path::new("missing")),
        Err(HubError::Scheme(_))
    ));
    assert_eq!(fx.hub.scheme().unwrap().components().len(), 1);
}

#[test]
fn test_save_without_path_or_scheme_fails() {
    let mut fx = Fixture::new(&[]);
    assert!(matches!(fx.hub.save_scheme(None), Err(HubError::NoScheme)));
}
