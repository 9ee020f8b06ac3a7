//! # Scheme Persistence
//!
//! JSON file format:
//!
//! ```text
//! {
//!   "components":  [ { type, name, module, enabled, x, y, settings, inputs, outputs } ],
//!   "connections": [ { outputModuleName, outputName, inputModuleName, inputName, RMIP, ... } ],
//!   "description": ""
//! }
//! ```
//!
//! Loading is lenient: malformed component or connection entries are
//! skipped with a warning. Duplicate component entries are kept and left
//! for [`Scheme::warn_duplicates`]. Saving writes a temp file and renames
//! it over the target.

use crate::component_info::ComponentInfo;
use crate::connection::ComponentConnection;
use crate::errors::SchemeError;
use crate::scheme::{Scheme, SchemeChange};
use serde_json::{json, Value as Json};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

impl Scheme {
    /// Build a scheme from its JSON document.
    #[must_use]
    pub fn from_json(doc: &Json) -> Self {
        let mut scheme = Self::new();
        scheme.fill_from_json(doc);
        scheme
    }

    fn fill_from_json(&mut self, doc: &Json) {
        if let Some(entries) = doc.get("components").and_then(Json::as_array) {
            for entry in entries {
                match ComponentInfo::from_json(entry.clone()) {
                    Ok(info) => self.push_component(info),
                    Err(e) => warn!(error = %e, "Skipping scheme component entry"),
                }
            }
        }

        if let Some(entries) = doc.get("connections").and_then(Json::as_array) {
            for entry in entries {
                match serde_json::from_value::<ComponentConnection>(entry.clone()) {
                    Ok(conn) => {
                        self.add_connection(conn);
                    }
                    Err(e) => warn!(error = %e, "Skipping scheme connection entry"),
                }
            }
        }

        self.description = doc
            .get("description")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string();

        self.note(SchemeChange::Components);
        self.note(SchemeChange::Connections);
    }

    #[must_use]
    pub fn to_json(&self) -> Json {
        let components: Vec<Json> = self.components().iter().map(ComponentInfo::to_json).collect();
        let connections: Vec<Json> = self
            .connections()
            .filter_map(|c| serde_json::to_value(c).ok())
            .collect();
        json!({
            "components": components,
            "connections": connections,
            "description": self.description(),
        })
    }

    /// Replace the contents with the scheme stored at `path`.
    ///
    /// On error the scheme is left untouched.
    pub fn load(&mut self, path: &Path) -> Result<(), SchemeError> {
        let bytes = std::fs::read(path).map_err(|e| SchemeError::io(path, &e))?;
        let doc: Json =
            serde_json::from_slice(&bytes).map_err(|e| SchemeError::Json(e.to_string()))?;
        if !doc.is_object() {
            return Err(SchemeError::Json("top level is not an object".into()));
        }

        self.clear();
        self.fill_from_json(&doc);
        self.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.last_path = Some(path.to_path_buf());
        self.note(SchemeChange::Loaded);

        info!(
            scheme = %self.name,
            components = self.components().len(),
            connections = self.connection_count(),
            "Scheme loaded"
        );
        Ok(())
    }

    /// Write the scheme to `path` and remember it as the current file.
    pub fn save(&mut self, path: &Path) -> Result<(), SchemeError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SchemeError::io(parent, &e))?;
        }
        let text = serde_json::to_vec_pretty(&self.to_json())
            .map_err(|e| SchemeError::Json(e.to_string()))?;

        let temp_path = path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(|e| SchemeError::io(&temp_path, &e))?;
        file.write_all(&text)
            .and_then(|()| file.sync_all())
            .map_err(|e| SchemeError::io(&temp_path, &e))?;
        std::fs::rename(&temp_path, path).map_err(|e| SchemeError::io(path, &e))?;

        self.last_path = Some(path.to_path_buf());
        info!(path = %path.display(), "Scheme saved");
        Ok(())
    }

    /// Load the last loaded file again. Returns `false` when there is none.
    pub fn reload(&mut self) -> Result<bool, SchemeError> {
        match self.last_path.clone() {
            Some(path) if path.exists() => self.load(&path).map(|()| true),
            _ => Ok(false),
        }
    }
}
