//! # Module Proxy Tests

use super::*;
use crate::domain::svc;
use crate::domain::{Header, ModuleError, Packet, PacketError};

const TEMP_SENSOR: u32 = 0x0000_0101;

fn reply(comp: u16, oid: u8, data: &[u8]) -> Packet {
    Packet::new(Header::service(oid, comp), data.to_vec())
}

fn class_reply(comp: u16, oid: u8, data: &[u8]) -> Packet {
    reply(comp, oid, data).into_class_channel()
}

/// Identity replies for a component without objects.
fn identity(comp: u16, class_id: u32, name: &str, class_name: &str, serial: u32) -> Vec<Packet> {
    vec![
        reply(comp, svc::CLASS, &class_id.to_le_bytes()),
        reply(comp, svc::NAME, name.as_bytes()),
        reply(comp, svc::SERIAL, &serial.to_le_bytes()),
        reply(comp, svc::CLASS_NAME, class_name.as_bytes()),
        reply(comp, svc::OBJECT_COUNT, &[0]),
    ]
}

fn feed(module: &mut ModuleProxy, packets: Vec<Packet>) -> Vec<ModuleEvent> {
    packets
        .iter()
        .flat_map(|p| module.receive_packet(p))
        .collect()
}

fn module_with_factory_class() -> ModuleProxy {
    let mut module = ModuleProxy::new("DeviceMod");
    module.receive_packet(&class_reply(1, svc::CLASS, &TEMP_SENSOR.to_le_bytes()));
    let proto = identity(1, TEMP_SENSOR, "", "TempSensor", 0)
        .into_iter()
        .map(Packet::into_class_channel)
        .collect();
    feed(&mut module, proto);
    let _ = module.sink().drain();
    module
}

#[test]
fn test_enumeration_packets() {
    let module = ModuleProxy::new("DeviceMod");
    module.enumerate_classes();
    module.enumerate_components();
    module.request_icon();

    let packets = module.sink().drain();
    let classes = packets[0].header();
    assert_eq!(classes.object_id, svc::POLL_CLASSES);
    assert!(classes.svc && classes.class_info && !classes.local);

    let nodes = packets[1].header();
    assert_eq!(nodes.object_id, svc::POLL_NODES);
    assert!(nodes.svc && !nodes.class_info && !nodes.local);

    let icon = packets[2].header();
    assert_eq!(icon.object_id, svc::ICON);
    assert!(icon.svc && icon.local);
}

#[test]
fn test_module_without_classes_is_ready() {
    let mut module = ModuleProxy::new("Empty");
    let events = module.receive_packet(&class_reply(0, svc::CLASS, &[]));
    assert_eq!(events, vec![ModuleEvent::Ready]);
    assert!(module.is_ready());

    // readiness is announced once
    assert!(module.receive_packet(&class_reply(0, svc::CLASS, &[])).is_empty());
}

#[test]
fn test_class_discovery_requests_class_info() {
    let mut module = ModuleProxy::new("DeviceMod");
    let events = module.receive_packet(&class_reply(1, svc::CLASS, &TEMP_SENSOR.to_le_bytes()));
    assert!(events.is_empty());
    assert_eq!(module.class_ids(), &[TEMP_SENSOR]);

    let packets = module.sink().drain();
    assert_eq!(packets.len(), 1);
    let header = packets[0].header();
    assert_eq!(header.object_id, svc::REQUEST_ALL_INFO);
    assert_eq!(header.component_id, 1);
    assert!(header.class_info && header.svc && header.local);
    assert_eq!(packets[0].payload(), TEMP_SENSOR.to_le_bytes());
}

#[test]
fn test_module_ready_after_prototypes() {
    let mut module = ModuleProxy::new("DeviceMod");
    module.receive_packet(&class_reply(1, svc::CLASS, &TEMP_SENSOR.to_le_bytes()));
    assert!(!module.is_ready());

    let proto = identity(1, TEMP_SENSOR, "", "TempSensor", 0)
        .into_iter()
        .map(Packet::into_class_channel)
        .collect();
    let events = feed(&mut module, proto);
    assert_eq!(events, vec![ModuleEvent::Ready]);
    assert_eq!(module.class_names(), vec!["TempSensor".to_string()]);
    assert!(module.class_by_name("TempSensor").unwrap().is_factory());
}

#[test]
fn test_out_of_order_class_index_ignored() {
    let mut module = ModuleProxy::new("DeviceMod");
    module.receive_packet(&class_reply(3, svc::CLASS, &TEMP_SENSOR.to_le_bytes()));
    assert!(module.class_ids().is_empty());
}

#[test]
fn test_create_component_payload() {
    let module = module_with_factory_class();
    module.create_component("TempSensor", Some("Sensor1")).unwrap();

    let packets = module.sink().drain();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].header().object_id, svc::CREATE);
    assert_eq!(packets[0].header().component_id, 0);
    let mut expected = TEMP_SENSOR.to_le_bytes().to_vec();
    expected.extend_from_slice(b"Sensor1");
    assert_eq!(packets[0].payload(), expected.as_slice());
}

#[test]
fn test_create_unknown_class_fails() {
    let module = module_with_factory_class();
    assert_eq!(
        module.create_component("Missing", None),
        Err(ModuleError::UnknownClass("Missing".into()))
    );
    assert!(module.sink().is_empty());
}

#[test]
fn test_hello_and_assign_component_id() {
    let mut module = module_with_factory_class();
    let events = module.receive_packet(&reply(0, svc::HELLO, &[]));
    assert_eq!(events, vec![ModuleEvent::NewComponent]);

    assert!(module.assign_component_id(4));
    let packets = module.sink().drain();
    assert_eq!(packets[0].header().object_id, svc::WELCOME);
    assert_eq!(packets[0].payload(), 4u16.to_le_bytes());
    let requests: Vec<u8> = packets[1..].iter().map(|p| p.header().object_id).collect();
    assert_eq!(requests, vec![svc::CLASS, svc::NAME, svc::REQUEST_ALL_INFO]);
    assert!(packets[1..].iter().all(|p| p.header().component_id == 4));

    assert!(!module.assign_component_id(4));
}

#[test]
fn test_factory_component_keeps_its_name() {
    let mut module = module_with_factory_class();
    module.assign_component_id(1);
    let events = feed(&mut module, identity(1, TEMP_SENSOR, "Sensor1", "", 7));

    assert_eq!(events, vec![ModuleEvent::ComponentReady(1)]);
    let component = module.component_by_name("Sensor1").unwrap();
    assert_eq!(component.type_name(), "TempSensor");
    assert_eq!(module.component_names_of_type("TempSensor"), vec!["Sensor1"]);
}

#[test]
fn test_self_registering_component_gets_prototype() {
    let mut module = ModuleProxy::new("Bus");
    module.receive_packet(&class_reply(0, svc::CLASS, &[]));
    module.assign_component_id(2);

    let events = feed(&mut module, identity(2, 0x55, "dev", "Relay", 0x1A2B));
    assert_eq!(
        events,
        vec![ModuleEvent::ComponentReady(2), ModuleEvent::Ready]
    );

    assert!(module.component_by_name("Relay_00001A2B").is_some());
    let proto = module.class_by_name("Relay").unwrap();
    assert!(!proto.is_factory());
    assert_eq!(proto.info().serial, 0);
    assert_eq!(
        module.create_component("Relay", Some("x")),
        Err(ModuleError::NotFactory("Relay".into()))
    );
}

#[test]
fn test_kill_removes_component() {
    let mut module = module_with_factory_class();
    module.assign_component_id(1);
    feed(&mut module, identity(1, TEMP_SENSOR, "Sensor1", "", 0));

    let events = module.receive_packet(&reply(1, svc::KILL, &[]));
    assert_eq!(
        events,
        vec![ModuleEvent::ComponentKilled {
            id: 1,
            name: "Sensor1".into()
        }]
    );
    assert!(module.component(1).is_none());
    assert!(module.component_by_name("Sensor1").is_none());
}

#[test]
fn test_message_tagged_with_component() {
    let mut module = module_with_factory_class();
    module.assign_component_id(1);
    feed(&mut module, identity(1, TEMP_SENSOR, "Sensor1", "", 0));

    let events = module.receive_packet(&reply(1, svc::MESSAGE, b"overheat"));
    assert_eq!(
        events,
        vec![ModuleEvent::Message {
            text: "overheat".into(),
            component: Some("Sensor1".into())
        }]
    );

    let events = module.receive_packet(&reply(0, svc::MESSAGE, b"hello"));
    assert_eq!(
        events,
        vec![ModuleEvent::Message {
            text: "hello".into(),
            component: None
        }]
    );
}

#[test]
fn test_icon_stored() {
    let mut module = ModuleProxy::new("DeviceMod");
    module.receive_packet(&reply(0, svc::ICON, &[0x89, 0x50]));
    assert_eq!(module.icon(), &[0x89, 0x50]);
}

#[test]
fn test_rename_component() {
    let mut module = module_with_factory_class();
    for (id, name) in [(1, "A"), (2, "B")] {
        module.assign_component_id(id);
        feed(&mut module, identity(id, TEMP_SENSOR, name, "", 0));
    }
    let _ = module.sink().drain();

    assert_eq!(
        module.rename_component("A", "B"),
        Err(ModuleError::NameTaken("B".into()))
    );
    assert_eq!(
        module.rename_component("Z", "Y"),
        Err(ModuleError::UnknownComponent("Z".into()))
    );

    assert!(module.sink().drain().is_empty());

    assert_eq!(module.rename_component("A", "C"), Ok(1));
    assert!(module.component_by_name("A").is_none());
    assert_eq!(module.component_by_name("C").unwrap().id(), 1);

    let sent = module.sink().drain();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].header().svc);
    assert_eq!(sent[0].header().object_id, svc::NAME);
    assert_eq!(sent[0].header().component_id, 1);
    assert_eq!(sent[0].payload(), b"C");
}

#[test]
fn test_delete_component_sends_kill() {
    let mut module = module_with_factory_class();
    module.assign_component_id(3);
    feed(&mut module, identity(3, TEMP_SENSOR, "Sensor1", "", 0));
    let _ = module.sink().drain();

    module.delete_component("Sensor1").unwrap();
    let packets = module.sink().drain();
    assert_eq!(packets[0].header().object_id, svc::KILL);
    assert_eq!(packets[0].header().component_id, 0);
    assert_eq!(packets[0].payload(), 3u16.to_le_bytes());

    assert!(module.delete_component("missing").is_err());
}

#[test]
fn test_truncated_frame_rejected() {
    let mut module = ModuleProxy::new("DeviceMod");
    assert_eq!(
        module.receive_frame(&[1, 2]),
        Err(PacketError::Truncated { len: 2 })
    );
}

#[test]
fn test_data_events_forwarded() {
    let mut module = module_with_factory_class();
    module.assign_component_id(1);
    let mut packets = identity(1, TEMP_SENSOR, "Sensor1", "", 0);
    packets.pop();
    packets.push(reply(1, svc::OBJECT_COUNT, &[1]));
    feed(&mut module, packets);

    let desc = crate::domain::ObjectDescription {
        id: 0,
        flags: crate::domain::ObjectFlags(0x05),
        ext_flags: 0,
        read_type: crate::domain::ValueType::Void,
        write_type: crate::domain::ValueType::Int,
        read_size: 0,
        write_size: 4,
        name: "value".into(),
    };
    let events = module.receive_packet(&reply(1, svc::OBJECT_INFO, &desc.encode()));
    assert_eq!(events, vec![ModuleEvent::ComponentReady(1)]);

    let data = Packet::new(Header::data(0, 1), 5i32.to_le_bytes().to_vec());
    assert_eq!(
        module.receive_packet(&data),
        vec![
            ModuleEvent::ObjectReceived { component: 1, oid: 0 },
            ModuleEvent::ObjectChanged { component: 1, oid: 0 }
        ]
    );
}
