//! File-system config cache.
//!
//! ```text
//! <configs_dir>/
//! ├── <module>/
//! │   └── <type>.config     compact component info JSON
//! └── <module>.png          module icon
//! ```

use crate::config::CONFIG_EXTENSION;
use crate::loader::LoaderError;
use crate::ports::ConfigCache;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct FsConfigCache {
    dir: PathBuf,
}

impl FsConfigCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.dir.join(module)
    }

    #[must_use]
    pub fn component_path(&self, module: &str, type_name: &str) -> PathBuf {
        self.module_dir(module)
            .join(format!("{type_name}.{CONFIG_EXTENSION}"))
    }

    #[must_use]
    pub fn icon_path(&self, module: &str) -> PathBuf {
        self.dir.join(format!("{module}.png"))
    }
}

/// Write through a sibling temp file so readers never see half a file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LoaderError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| LoaderError::io(parent, &e))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(|e| LoaderError::io(&tmp, &e))?;
    fs::rename(&tmp, path).map_err(|e| LoaderError::io(path, &e))
}

impl ConfigCache for FsConfigCache {
    fn module_exists(&self, module: &str) -> bool {
        self.module_dir(module).is_dir()
    }

    fn write_component(&mut self, module: &str, type_name: &str, info: &Json) -> Result<bool, LoaderError> {
        let path = self.component_path(module, type_name);
        if path.exists() {
            return Ok(false);
        }
        let bytes = serde_json::to_vec(info).map_err(|e| LoaderError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        write_atomic(&path, &bytes)?;
        debug!(module = %module, class = %type_name, "Component config cached");
        Ok(true)
    }

    fn write_icon(&mut self, module: &str, icon: &[u8]) -> Result<bool, LoaderError> {
        let dir = self.module_dir(module);
        fs::create_dir_all(&dir).map_err(|e| LoaderError::io(&dir, &e))?;
        let path = self.icon_path(module);
        if path.exists() {
            return Ok(false);
        }
        write_atomic(&path, icon)?;
        Ok(true)
    }

    fn remove_module(&mut self, module: &str) -> Result<(), LoaderError> {
        let dir = self.module_dir(module);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| LoaderError::io(&dir, &e))?;
        }
        let icon = self.icon_path(module);
        if icon.exists() {
            fs::remove_file(&icon).map_err(|e| LoaderError::io(&icon, &e))?;
        }
        Ok(())
    }

    fn read_all(&self) -> Result<BTreeMap<String, BTreeMap<String, Json>>, LoaderError> {
        let mut all = BTreeMap::new();
        if !self.dir.exists() {
            return Ok(all);
        }
        let modules = fs::read_dir(&self.dir).map_err(|e| LoaderError::io(&self.dir, &e))?;
        for module_dir in modules.flatten() {
            let path = module_dir.path();
            if !path.is_dir() {
                continue;
            }
            let Some(module) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let files = fs::read_dir(&path).map_err(|e| LoaderError::io(&path, &e))?;
            let mut classes = BTreeMap::new();
            for file in files.flatten() {
                let file = file.path();
                if file.extension().map_or(true, |e| e != CONFIG_EXTENSION) {
                    continue;
                }
                let Some(type_name) = file.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let parsed = fs::read(&file)
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| serde_json::from_slice::<Json>(&bytes).map_err(|e| e.to_string()));
                match parsed {
                    Ok(info) => {
                        classes.insert(type_name.to_string(), info);
                    }
                    Err(e) => warn!(path = %file.display(), error = %e, "Unreadable config skipped"),
                }
            }
            all.insert(module, classes);
        }
        Ok(all)
    }
}
