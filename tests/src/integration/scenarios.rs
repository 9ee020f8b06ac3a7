//! # Reconciliation and Link Scenarios
//!
//! ## Flows Tested
//!
//! 1. **Scheme file → loader → module**: a scheme saved to disk drives a
//!    cold module start and exactly one create request
//! 2. **Duplicate scheme entries**: tolerated, one extra component created
//! 3. **Link type safety**: incompatible objects are never linked
//! 4. **Unlink restores default**: a disabled link leaves the subscriber as
//!    it was before linking and stops forwarding
//! 5. **Observer notifications**: component lifecycle reaches the event bus

#[cfg(test)]
mod tests {
    use crate::integration::harness::{device_module, log_module, Harness, TEMP_SENSOR};
    use hub_runtime::ports::ConfigCache;
    use hub_runtime::test_utils::{SimObject, SimulatedModule};
    use onb_protocol::domain::svc;
    use onb_protocol::{Value, ValueType};
    use scheme_store::{ComponentConnection, ComponentInfo, Scheme};
    use serde_json::json;
    use shared_bus::{EventFilter, EventTopic, HubEvent};
    use std::path::{Path, PathBuf};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn sensor_and_logger(input: &str) -> Scheme {
        let mut scheme = Scheme::new();
        scheme
            .add_component(ComponentInfo::new("Sensor1", "TempSensor", "DeviceMod"))
            .unwrap();
        scheme
            .add_component(ComponentInfo::new("Logger1", "Logger", "LogMod"))
            .unwrap();
        scheme.add_connection(ComponentConnection::new(
            ("Sensor1", "value"),
            ("Logger1", input),
            0,
        ));
        scheme
    }

    /// Both components live, scheme installed, hub still disabled.
    fn live_pair(input: &str) -> (Harness, u16, u16) {
        let mut h = Harness::start(|_| {});
        h.hub.set_scheme(Some(sensor_and_logger(input)));
        let device = device_module();
        let log = log_module();
        h.connect("DeviceMod", &device);
        h.connect("LogMod", &log);
        let sensor = h.spawn("DeviceMod", &device, "TempSensor", "Sensor1");
        let logger = h.spawn("LogMod", &log, "Logger", "Logger1");
        (h, sensor, logger)
    }

    // =============================================================================
    // RECONCILIATION
    // =============================================================================

    #[test]
    fn test_saved_scheme_starts_cold_module_and_creates_once() {
        let h = &mut Harness::start(|config| {
            Harness::install(config, &["DeviceMod", "LogMod"]);
            std::fs::create_dir_all(&config.schemes_dir).unwrap();
            let mut scheme = Scheme::new();
            scheme
                .add_component(ComponentInfo::new("Sensor1", "TempSensor", "DeviceMod"))
                .unwrap();
            scheme.save(&config.schemes_dir.join("plant.scheme")).unwrap();
            config.scheme_path = Some(PathBuf::from("plant"));
        });

        // only the module the scheme needs is started
        assert_eq!(h.launcher.spawned(), vec!["DeviceMod".to_string()]);
        let (args, _dir) = h.launcher.invocation("DeviceMod").unwrap();
        assert_eq!(args, vec!["-i", "127.0.0.1", "-p", "8080"]);

        h.connect("DeviceMod", &device_module());
        let creates = h.sent("DeviceMod", svc::CREATE);
        assert_eq!(creates.len(), 1);
        let mut expected = TEMP_SENSOR.to_le_bytes().to_vec();
        expected.extend_from_slice(b"Sensor1");
        assert_eq!(creates[0].payload(), expected.as_slice());

        // harvesting configs did not stop a module the scheme needs
        assert!(h.configs.module_exists("DeviceMod"));
        assert!(h.launcher.killed().is_empty());

        h.hub.check_current_scheme_components();
        assert!(h.sent("DeviceMod", svc::CREATE).is_empty());
    }

    #[test]
    fn test_duplicate_entries_create_one_more_component() {
        let mut h = Harness::start(|_| {});
        let sim = SimulatedModule::new().with_class(
            0x0A,
            "TypeA",
            vec![SimObject::output(0, "out", ValueType::Int)],
        );
        h.hub.set_scheme(Some(Scheme::new()));
        h.connect("ModB", &sim);
        h.spawn("ModB", &sim, "TypeA", "X");
        let _ = h.frames.take();

        let doc = json!({
            "components": [
                { "type": "TypeA", "name": "X", "module": "ModB" },
                { "type": "TypeA", "name": "X", "module": "ModB" }
            ]
        });
        let schemes_dir = h.hub.config().schemes_dir.clone();
        std::fs::create_dir_all(&schemes_dir).unwrap();
        std::fs::write(
            schemes_dir.join("dupes.scheme"),
            serde_json::to_vec_pretty(&doc).unwrap(),
        )
        .unwrap();
        h.hub.load_scheme(Path::new("dupes")).unwrap();

        let packets = h.frames.take_for("ModB");
        let count = |oid| {
            packets
                .iter()
                .filter(|p| p.header().svc && p.header().object_id == oid)
                .count()
        };
        assert_eq!(count(svc::KILL), 0);
        assert_eq!(count(svc::CREATE), 1);
        assert_eq!(h.hub.scheme().unwrap().duplicates().len(), 1);

        h.hub.check_current_scheme_components();
        assert!(h.sent("ModB", svc::CREATE).is_empty());
    }

    // =============================================================================
    // LINKS
    // =============================================================================

    #[test]
    fn test_incompatible_connection_is_not_linked() {
        let (mut h, _sensor, _logger) = live_pair("label");
        let _ = h.frames.take();

        h.hub.set_enabled(true);

        assert!(h.hub.links().is_empty());
        assert!(h.sent("DeviceMod", svc::SUBSCRIBE).is_empty());
        let label = h
            .hub
            .live_component("Logger1")
            .unwrap()
            .object_by_name("label")
            .unwrap();
        assert!(!label.is_linked());
    }

    #[test]
    fn test_unlink_restores_subscriber_default() {
        let (mut h, sensor, _logger) = live_pair("input");
        let input = |h: &Harness| {
            h.hub
                .live_component("Logger1")
                .unwrap()
                .object_by_name("input")
                .unwrap()
                .read_value()
        };
        let before = input(&h);

        h.hub.set_enabled(true);
        assert_eq!(h.hub.links().len(), 1);
        h.hub
            .receive_frame("DeviceMod", &SimulatedModule::data(sensor, 0, &21i32.to_le_bytes()));
        assert_eq!(input(&h), Some(Value::Int(21)));

        h.hub.set_enabled(false);
        assert!(h.hub.links().is_empty());
        assert_eq!(input(&h), before);

        let _ = h.frames.take();
        h.hub
            .receive_frame("DeviceMod", &SimulatedModule::data(sensor, 0, &22i32.to_le_bytes()));
        let data: Vec<_> = h
            .frames
            .take_for("LogMod")
            .into_iter()
            .filter(|p| !p.header().svc)
            .collect();
        assert!(data.is_empty());
    }

    // =============================================================================
    // OBSERVERS
    // =============================================================================

    #[test]
    fn test_component_lifecycle_reaches_observers() {
        let mut h = Harness::start(|_| {});
        let mut components = h.subscribe(EventFilter::topics(vec![EventTopic::Components]));
        h.hub.set_scheme(Some(sensor_and_logger("input")));
        let device = device_module();
        h.connect("DeviceMod", &device);
        let sensor = h.spawn("DeviceMod", &device, "TempSensor", "Sensor1");
        h.hub.receive_frame("DeviceMod", &SimulatedModule::kill(sensor));

        let events = components.drain();
        let added = events.iter().position(|e| {
            matches!(e, HubEvent::ComponentAdded { component, .. } if component == "Sensor1")
        });
        let killed = events.iter().position(|e| {
            matches!(e, HubEvent::ComponentKilled { component, .. } if component == "Sensor1")
        });
        assert!(added.unwrap() < killed.unwrap());
        assert!(events.iter().all(|e| e.topic() == EventTopic::Components));
        assert!(h.hub.locate("Sensor1").is_none());
    }
}
