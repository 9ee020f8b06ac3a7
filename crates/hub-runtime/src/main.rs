//! # xo-hub
//!
//! Starts the module transport, discovers and launches modules, loads the
//! startup scheme and runs the hub until Ctrl+C.
//!
//! ## Environment Variables
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `XO_HUB_ROOT` | root folder (configs, schemes, modules) |
//! | `XO_LAUNCH_MANIFEST` | launch manifest replacing the module scan |
//! | `XO_SCHEME` | scheme loaded at startup |
//! | `XO_HUB_HOST` / `XO_HUB_PORT` | address modules connect to |
//! | `XO_AUTOSTART` | link the scheme right after startup |

use anyhow::{Context, Result};
use hub_runtime::adapters::{
    serve, ConnectionRegistry, FsConfigCache, StdProcessLauncher, TokioTimers,
};
use hub_runtime::{command_channel, Hub, HubCommand, HubConfig, HubPorts, HubRuntime};
use hub_telemetry::{init_telemetry, TelemetryConfig};
use shared_bus::{EventFilter, EventStream, InMemoryEventBus};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::StreamExt;
use tracing::{info, warn};

fn load_config() -> HubConfig {
    let mut config = match std::env::var("XO_HUB_ROOT") {
        Ok(root) => HubConfig::with_root(root),
        Err(_) => HubConfig::default(),
    };

    if let Ok(path) = std::env::var("XO_LAUNCH_MANIFEST") {
        config.launch_manifest = Some(PathBuf::from(path));
    }
    if let Ok(path) = std::env::var("XO_SCHEME") {
        config.scheme_path = Some(PathBuf::from(path));
    }
    if let Ok(host) = std::env::var("XO_HUB_HOST") {
        config.host = host;
    }
    if let Ok(port) = std::env::var("XO_HUB_PORT") {
        match port.parse() {
            Ok(p) => config.port = p,
            Err(_) => warn!(value = %port, "XO_HUB_PORT is not a port number, ignored"),
        }
    }
    if let Ok(flag) = std::env::var("XO_AUTOSTART") {
        config.enabled_on_start = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
    }

    config
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = load_config();
    config.validate().context("Invalid hub configuration")?;
    for dir in [&config.configs_dir, &config.schemes_dir, &config.modules_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;

    // =========================================================================
    // EVENT BUS
    // =========================================================================
    let bus = Arc::new(InMemoryEventBus::new());
    let mut events = EventStream::new(bus.subscribe(EventFilter::all()));
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            info!(topic = ?event.topic(), event = ?event, "Hub event");
        }
    });

    // =========================================================================
    // HUB
    // =========================================================================
    let (commands_tx, commands_rx) = command_channel();
    let registry = ConnectionRegistry::new();
    let ports = HubPorts {
        timers: Box::new(TokioTimers::new(commands_tx.clone())),
        frames: Box::new(registry.clone()),
        configs: Box::new(FsConfigCache::new(config.configs_dir.clone())),
        launcher: Box::new(StdProcessLauncher::new()),
    };
    let mut hub = Hub::new(config, ports, bus.clone());
    hub.start().context("Failed to start hub")?;

    tokio::spawn(serve(listener, commands_tx.clone(), registry));
    let runtime = tokio::spawn(HubRuntime::new(hub, commands_rx).run());

    info!("Hub is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    // Graceful shutdown
    let _ = commands_tx.send(HubCommand::Shutdown);
    runtime.await.context("Hub runtime task failed")?;
    Ok(())
}
