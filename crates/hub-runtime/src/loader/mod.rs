//! # Module Loader
//!
//! Knows which module executables exist, how each one starts, and which
//! ones are running.
//!
//! ## Start Types
//!
//! | Type | Started | Stopped |
//! |------|---------|---------|
//! | `Hot`  | at startup | never by the hub |
//! | `Cold` | when the scheme needs it | when the scheme no longer needs it |
//!
//! Modules missing from the start options file are `Cold`.
//!
//! ## Process Lifetime
//!
//! A started module holds a [`ChildProcess`] handle until it exits (seen by
//! [`Loader::reap`]) or is stopped. Stopping kills the child and waits for
//! it before the handle is released; [`Loader::shutdown`] does this for
//! every child.

pub mod manifest;
pub mod start_options;


use crate::config::HubConfig;
use crate::ports::{ChildProcess, ProcessLauncher};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Loader failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("I/O error on {path:?}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to spawn module {module}: {message}")]
    Spawn { module: String, message: String },

    #[error("Unknown module: {0}")]
    UnknownModule(String),
}

impl LoaderError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartType {
    #[default]
    Cold,
    Hot,
}

/// One launchable module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    pub name: String,
    pub executable: PathBuf,
}

impl ModuleEntry {
    /// Directory the module runs in.
    #[must_use]
    pub fn working_dir(&self) -> PathBuf {
        self.executable
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

/// Executable of module `name` inside `modules_dir`.
#[must_use]
pub fn executable_path(modules_dir: &Path, name: &str) -> PathBuf {
    let file = if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    };
    modules_dir.join(name).join(file)
}

pub struct Loader {
    modules_dir: PathBuf,
    launch_manifest: Option<PathBuf>,
    start_options_path: PathBuf,
    host: String,
    port: u16,
    entries: BTreeMap<String, ModuleEntry>,
    start_types: BTreeMap<String, StartType>,
    running: BTreeMap<String, Box<dyn ChildProcess>>,
    core_plugins: Vec<PathBuf>,
    launcher: Box<dyn ProcessLauncher>,
}

impl Loader {
    pub fn new(config: &HubConfig, launcher: Box<dyn ProcessLauncher>) -> Self {
        Self {
            modules_dir: config.modules_dir.clone(),
            launch_manifest: config.launch_manifest.clone(),
            start_options_path: config.start_options_path.clone(),
            host: config.host.clone(),
            port: config.port,
            entries: BTreeMap::new(),
            start_types: BTreeMap::new(),
            running: BTreeMap::new(),
            core_plugins: Vec::new(),
            launcher,
        }
    }

    // =========================================================================
    // DISCOVERY
    // =========================================================================

    /// Read start options and find the launchable modules. Returns how many
    /// modules were found.
    pub fn discover(&mut self) -> Result<usize, LoaderError> {
        self.start_types = start_options::load(&self.start_options_path)?;
        self.entries.clear();
        self.core_plugins.clear();

        match self.launch_manifest.clone() {
            Some(path) => self.discover_from_manifest(&path)?,
            None => self.discover_from_directory()?,
        }

        info!(
            modules = self.entries.len(),
            core_plugins = self.core_plugins.len(),
            "Module discovery complete"
        );
        Ok(self.entries.len())
    }

    fn discover_from_manifest(&mut self, path: &Path) -> Result<(), LoaderError> {
        for entry in manifest::load(path)? {
            if !entry.enabled {
                continue;
            }
            if entry.core {
                debug!(path = %entry.path.display(), "Core plugin recorded");
                self.core_plugins.push(entry.path);
                continue;
            }
            let Some(name) = entry.module_name() else {
                continue;
            };
            self.add_entry(name, entry.path);
        }
        Ok(())
    }

    fn discover_from_directory(&mut self) -> Result<(), LoaderError> {
        let dir = self.modules_dir.clone();
        let read = match std::fs::read_dir(&dir) {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %dir.display(), "Modules folder does not exist");
                return Ok(());
            }
            Err(e) => return Err(LoaderError::io(&dir, &e)),
        };
        for item in read {
            let item = item.map_err(|e| LoaderError::io(&dir, &e))?;
            if !item.path().is_dir() {
                continue;
            }
            let name = item.file_name().to_string_lossy().into_owned();
            let executable = executable_path(&dir, &name);
            self.add_entry(name, executable);
        }
        Ok(())
    }

    fn add_entry(&mut self, name: String, executable: PathBuf) {
        if !executable.exists() {
            warn!(module = %name, path = %executable.display(), "Module executable does not exist");
            return;
        }
        self.entries.insert(name.clone(), ModuleEntry { name, executable });
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains_key(name)
    }

    #[must_use]
    pub fn start_type(&self, name: &str) -> StartType {
        self.start_types.get(name).copied().unwrap_or_default()
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn running_modules(&self) -> impl Iterator<Item = &str> {
        self.running.keys().map(String::as_str)
    }

    #[must_use]
    pub fn core_plugins(&self) -> &[PathBuf] {
        &self.core_plugins
    }

    // =========================================================================
    // PROCESS CONTROL
    // =========================================================================

    /// Start every `Hot` module.
    pub fn start_hot_modules(&mut self) {
        let hot: Vec<String> = self
            .entries
            .keys()
            .filter(|name| self.start_type(name) == StartType::Hot)
            .cloned()
            .collect();
        for name in hot {
            if let Err(e) = self.start_module(&name) {
                warn!(module = %name, error = %e, "Failed to start module");
            }
        }
    }

    /// Launch a module. Returns `false` if it is unknown or already running.
    pub fn start_module(&mut self, name: &str) -> Result<bool, LoaderError> {
        let Some(entry) = self.entries.get(name) else {
            return Ok(false);
        };
        if self.running.contains_key(name) {
            return Ok(false);
        }

        let args = vec![
            "-i".to_string(),
            self.host.clone(),
            "-p".to_string(),
            self.port.to_string(),
        ];
        let child = self
            .launcher
            .spawn(name, &entry.executable, &args, &entry.working_dir())?;
        info!(module = %name, pid = child.id(), "Module process started");
        self.running.insert(name.to_string(), child);
        Ok(true)
    }

    /// Kill a module and wait for it. `Hot` modules are never stopped.
    /// Returns `true` if a process was stopped.
    pub fn stop_module(&mut self, name: &str) -> Result<bool, LoaderError> {
        if !self.entries.contains_key(name) || self.start_type(name) == StartType::Hot {
            return Ok(false);
        }
        let Some(mut child) = self.running.remove(name) else {
            return Ok(false);
        };
        child.kill_and_wait()?;
        info!(module = %name, "Module process stopped");
        Ok(true)
    }

    /// Change and persist a module's start type, then start (`Hot`) or stop
    /// (`Cold`) it right away.
    pub fn set_start_type(&mut self, name: &str, start_type: StartType) -> Result<(), LoaderError> {
        self.start_types.insert(name.to_string(), start_type);
        match start_type {
            StartType::Hot => {
                self.start_module(name)?;
            }
            StartType::Cold => {
                self.stop_module(name)?;
            }
        }
        start_options::save(&self.start_options_path, &self.start_types)
    }

    /// Collect finished children. Returns the modules whose process exited.
    pub fn reap(&mut self) -> Vec<String> {
        let mut exited = Vec::new();
        for (name, child) in &mut self.running {
            match child.try_wait() {
                Ok(Some(code)) => {
                    info!(module = %name, code, "Module process exited");
                    exited.push(name.clone());
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(module = %name, error = %e, "Lost track of module process");
                    exited.push(name.clone());
                }
            }
        }
        for name in &exited {
            self.running.remove(name);
        }
        exited
    }

    /// Kill and wait for every child.
    pub fn shutdown(&mut self) {
        for (name, mut child) in std::mem::take(&mut self.running) {
            match child.kill_and_wait() {
                Ok(()) => info!(module = %name, "Module process stopped"),
                Err(e) => warn!(module = %name, error = %e, "Failed to stop module process"),
            }
        }
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("modules", &self.entries.keys().collect::<Vec<_>>())
            .field("running", &self.running.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
