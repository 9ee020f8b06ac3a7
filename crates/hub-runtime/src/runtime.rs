//! # Hub Runtime
//!
//! The one task that owns the [`Hub`]. Transport, timers and operators talk
//! to it only through [`HubCommand`]s, so every state change happens on a
//! single control flow in arrival order.
//!
//! ```text
//!  serve() ── ModuleConnected / Frame / ModuleDisconnected ──┐
//!  TokioTimers ── TimerFired ───────────────────────────────┤
//!  operator ── scheme, enable, loader commands ─────────────┤
//!                                                           ▼
//!                                               mpsc ──▶ HubRuntime::run
//! ```

use crate::hub::{Hub, HubError};
use crate::loader::StartType;
use crate::ports::TimerKey;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Everything that can happen to the hub.
#[derive(Debug)]
pub enum HubCommand {
    ModuleConnected { module: String },
    Frame { module: String, frame: Vec<u8> },
    ModuleDisconnected { module: String },
    TimerFired(TimerKey),
    SetEnabled(bool),
    LoadScheme(PathBuf),
    SaveScheme(Option<PathBuf>),
    ClearScheme,
    ReloadScheme,
    DeleteScheme(PathBuf),
    CreateComponent { type_name: String, module: String },
    RemoveComponent(String),
    RefreshConfigs(String),
    SetStartType { module: String, start_type: StartType },
    Shutdown,
}

/// Sender and receiver for [`HubCommand`]s.
#[must_use]
pub fn command_channel() -> (
    mpsc::UnboundedSender<HubCommand>,
    mpsc::UnboundedReceiver<HubCommand>,
) {
    mpsc::unbounded_channel()
}

pub struct HubRuntime {
    hub: Hub,
    commands: mpsc::UnboundedReceiver<HubCommand>,
}

impl HubRuntime {
    pub fn new(hub: Hub, commands: mpsc::UnboundedReceiver<HubCommand>) -> Self {
        Self { hub, commands }
    }

    #[must_use]
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Process commands until `Shutdown` or until every sender is gone.
    /// Returns the hub, shut down.
    pub async fn run(mut self) -> Hub {
        info!("Hub runtime started");
        while let Some(command) = self.commands.recv().await {
            if matches!(command, HubCommand::Shutdown) {
                info!("Shutdown requested");
                break;
            }
            if let Err(e) = self.handle(command) {
                warn!(error = %e, "Hub command failed");
            }
        }
        self.hub.shutdown();
        self.hub
    }

    /// Apply one command to the hub.
    pub fn handle(&mut self, command: HubCommand) -> Result<(), HubError> {
        match command {
            HubCommand::ModuleConnected { module } => self.hub.add_module(&module),
            HubCommand::Frame { module, frame } => self.hub.receive_frame(&module, &frame),
            HubCommand::ModuleDisconnected { module } => self.hub.remove_module(&module),
            HubCommand::TimerFired(key) => self.hub.on_timer(&key),
            HubCommand::SetEnabled(enabled) => self.hub.set_enabled(enabled),
            HubCommand::LoadScheme(path) => self.hub.load_scheme(&path)?,
            HubCommand::SaveScheme(path) => {
                let written = self.hub.save_scheme(path.as_deref())?;
                info!(path = %written.display(), "Scheme saved");
            }
            HubCommand::ClearScheme => self.hub.clear_scheme(),
            HubCommand::ReloadScheme => {
                if !self.hub.reload_scheme()? {
                    debug!("No scheme file to reload");
                }
            }
            HubCommand::DeleteScheme(path) => self.hub.delete_scheme(&path)?,
            HubCommand::CreateComponent { type_name, module } => {
                let name = self.hub.create_component_in_scheme(&type_name, &module)?;
                info!(component = %name, module = %module, "Component added to scheme");
            }
            HubCommand::RemoveComponent(name) => {
                self.hub.remove_component_from_scheme(&name)?;
            }
            HubCommand::RefreshConfigs(module) => self.hub.refresh_configs(&module)?,
            HubCommand::SetStartType { module, start_type } => {
                self.hub.set_start_type(&module, start_type)?;
            }
            HubCommand::Shutdown => {}
        }
        Ok(())
    }
}
