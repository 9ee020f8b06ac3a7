//! # Runtime over TCP
//!
//! The complete runtime: TCP transport, tokio timers, the command loop and
//! the event bus, with a simulated module on the other end of a socket.
//! Only process spawning and the config cache are doubles.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{device_module, TEMP_SENSOR};
    use hub_runtime::adapters::{read_frame, serve, write_frame, ConnectionRegistry, TokioTimers};
    use hub_runtime::test_utils::{install_module, InMemoryConfigCache, RecordingLauncher, SimulatedModule};
    use hub_runtime::{command_channel, Hub, HubCommand, HubConfig, HubPorts, HubRuntime};
    use onb_protocol::domain::svc;
    use onb_protocol::Packet;
    use scheme_store::{ComponentInfo, Scheme};
    use shared_bus::{EventFilter, HubEvent, InMemoryEventBus, Subscription};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    /// Read frames until a service packet with `oid` arrives.
    async fn expect_service(client: &mut TcpStream, oid: u8) -> Packet {
        timeout(WAIT, async {
            loop {
                let frame = read_frame(client).await.unwrap().unwrap();
                let packet = Packet::decode(&frame).unwrap();
                if packet.header().svc && packet.header().object_id == oid {
                    return packet;
                }
            }
        })
        .await
        .unwrap()
    }

    async fn expect_event(events: &mut Subscription, wanted: impl Fn(&HubEvent) -> bool) -> HubEvent {
        timeout(WAIT, async {
            loop {
                let event = events.recv().await.unwrap();
                if wanted(&event) {
                    return event;
                }
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_module_session_over_tcp() {
        let dir = TempDir::new().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut config = HubConfig::with_root(dir.path());
        config.port = addr.port();
        install_module(&config.modules_dir, "DeviceMod").unwrap();
        std::fs::create_dir_all(&config.schemes_dir).unwrap();
        let mut scheme = Scheme::new();
        scheme
            .add_component(ComponentInfo::new("Sensor1", "TempSensor", "DeviceMod"))
            .unwrap();
        scheme.save(&config.schemes_dir.join("plant.scheme")).unwrap();
        config.scheme_path = Some(PathBuf::from("plant"));

        let (commands_tx, commands_rx) = command_channel();
        let registry = ConnectionRegistry::new();
        let launcher = RecordingLauncher::new();
        let bus = Arc::new(InMemoryEventBus::new());
        let mut events = bus.subscribe(EventFilter::all());
        let ports = HubPorts {
            timers: Box::new(TokioTimers::new(commands_tx.clone())),
            frames: Box::new(registry.clone()),
            configs: Box::new(InMemoryConfigCache::new()),
            launcher: Box::new(launcher.clone()),
        };
        let mut hub = Hub::new(config, ports, bus.clone());
        hub.start().unwrap();

        // the loader was told where to connect
        let (args, _) = launcher.invocation("DeviceMod").unwrap();
        assert_eq!(args[3], addr.port().to_string());

        tokio::spawn(serve(listener, commands_tx.clone(), registry));
        let runtime = tokio::spawn(HubRuntime::new(hub, commands_rx).run());

        // the module connects and answers class enumeration
        let device = device_module();
        let mut client = TcpStream::connect(addr).await.unwrap();
        write_frame(&mut client, b"DeviceMod").await.unwrap();
        for frame in device.class_frames() {
            write_frame(&mut client, &frame).await.unwrap();
        }

        let create = expect_service(&mut client, svc::CREATE).await;
        let mut expected = TEMP_SENSOR.to_le_bytes().to_vec();
        expected.extend_from_slice(b"Sensor1");
        assert_eq!(create.payload(), expected.as_slice());

        // the module creates it and gets an id
        write_frame(&mut client, &SimulatedModule::hello()).await.unwrap();
        let welcome = expect_service(&mut client, svc::WELCOME).await;
        let id = u16::from_le_bytes([welcome.payload()[0], welcome.payload()[1]]);
        assert_eq!(id, 1);
        for frame in device.component_frames(id, "TempSensor", "Sensor1") {
            write_frame(&mut client, &frame).await.unwrap();
        }
        expect_event(&mut events, |e| {
            matches!(e, HubEvent::ComponentAdded { component, .. } if component == "Sensor1")
        })
        .await;

        // the transport goes away
        drop(client);
        expect_event(&mut events, |e| {
            matches!(e, HubEvent::ModuleRemoved { module } if module == "DeviceMod")
        })
        .await;

        commands_tx.send(HubCommand::Shutdown).unwrap();
        let hub = timeout(WAIT, runtime).await.unwrap().unwrap();
        assert!(hub.module("DeviceMod").is_none());
        assert!(hub.locate("Sensor1").is_none());
        assert!(hub.scheme().unwrap().component("Sensor1").is_some());
    }
}
