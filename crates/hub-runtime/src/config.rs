//! # Hub Configuration
//!
//! Folder layout, listen address and timer periods.
//!
//! ## Folder Layout
//!
//! ```text
//! <root>/
//! ├── xoConfigs/<module>/<type>.config   per-class config cache
//! ├── xoSchemes/<name>.scheme            saved schemes
//! ├── xoModules/<module>/<module>        module executables
//! └── ModuleStartOptions                 "<module> <0|1>" lines
//! ```
//!
//! Environment overrides are applied by the binary (`load_config` in
//! `main.rs`) on top of [`HubConfig::default`].

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Extension of saved scheme files.
pub const SCHEME_EXTENSION: &str = "scheme";

/// Extension of per-class config cache files.
pub const CONFIG_EXTENSION: &str = "config";

/// Complete hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub root_dir: PathBuf,
    pub configs_dir: PathBuf,
    pub schemes_dir: PathBuf,
    pub modules_dir: PathBuf,
    pub start_options_path: PathBuf,
    /// Optional launch manifest replacing the module directory scan.
    pub launch_manifest: Option<PathBuf>,
    /// Scheme loaded at startup.
    pub scheme_path: Option<PathBuf>,
    /// Address modules are told to connect to.
    pub host: String,
    pub port: u16,
    /// Period of the live-component enumeration poll.
    pub instance_poll_interval: Duration,
    /// Period of the child-process exit check.
    pub process_reap_interval: Duration,
    /// Period of the traffic meter sample.
    pub traffic_sample_interval: Duration,
    /// Link the scheme as soon as the hub starts.
    pub enabled_on_start: bool,
}

impl HubConfig {
    /// Defaults with every folder placed under `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root_dir = root.into();
        Self {
            configs_dir: root_dir.join("xoConfigs"),
            schemes_dir: root_dir.join("xoSchemes"),
            modules_dir: root_dir.join("xoModules"),
            start_options_path: root_dir.join("ModuleStartOptions"),
            root_dir,
            launch_manifest: None,
            scheme_path: None,
            host: "127.0.0.1".to_string(),
            port: 8080,
            instance_poll_interval: Duration::from_millis(200),
            process_reap_interval: Duration::from_millis(100),
            traffic_sample_interval: Duration::from_millis(16),
            enabled_on_start: false,
        }
    }

    /// Check the configuration before anything touches the disk or network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        let folders: [(&'static str, &Path); 4] = [
            ("configs_dir", &self.configs_dir),
            ("schemes_dir", &self.schemes_dir),
            ("modules_dir", &self.modules_dir),
            ("start_options_path", &self.start_options_path),
        ];
        for (field, path) in folders {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyPath(field));
            }
        }
        Ok(())
    }

    /// Resolve a scheme file name: `.scheme` is appended when missing and a
    /// bare name that does not exist is looked up in `schemes_dir`.
    #[must_use]
    pub fn scheme_file(&self, path: &Path) -> PathBuf {
        let path = if path.extension().is_some_and(|e| e == SCHEME_EXTENSION) {
            path.to_path_buf()
        } else {
            let mut name = path.as_os_str().to_owned();
            name.push(".");
            name.push(SCHEME_EXTENSION);
            PathBuf::from(name)
        };
        if path.exists() || path.is_absolute() {
            path
        } else {
            self.schemes_dir.join(path)
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::with_root(".")
    }
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid listen port: {0}")]
    InvalidPort(u16),

    #[error("Folder path `{0}` is empty")]
    EmptyPath(&'static str),
}
