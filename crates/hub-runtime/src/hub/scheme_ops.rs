//! Scheme editing and persistence as seen from the hub.
//!
//! Every mutation goes through the scheme's change log; the hub drains it,
//! publishes one `SchemeChanged` and reconciles.

use super::{Hub, HubError};
use scheme_store::{ComponentConnection, ComponentInfo, Scheme, SchemeChange, SchemeError};
use shared_bus::HubEvent;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

impl Hub {
    #[must_use]
    pub fn scheme(&self) -> Option<&Scheme> {
        self.scheme.as_ref()
    }

    /// Install a scheme (or none) and reconcile.
    pub fn set_scheme(&mut self, scheme: Option<Scheme>) {
        self.scheme = scheme;
        if let Some(scheme) = &mut self.scheme {
            scheme.warn_duplicates();
            scheme.take_changes();
        }
        self.publish(HubEvent::SchemeChanged {
            components: true,
            connections: true,
        });
        self.forget_pending_requests();
        self.check_current_scheme_components();
    }

    /// Run `edit` on the scheme, creating an empty one if none is loaded,
    /// then react to whatever it changed.
    pub fn edit_scheme<R>(&mut self, edit: impl FnOnce(&mut Scheme) -> R) -> R {
        let result = edit(self.scheme.get_or_insert_with(Scheme::new));
        self.apply_scheme_changes();
        result
    }

    fn apply_scheme_changes(&mut self) {
        let Some(scheme) = self.scheme.as_mut() else {
            return;
        };
        let changes = scheme.take_changes();
        if changes.is_empty() {
            return;
        }
        let all = changes
            .iter()
            .any(|c| matches!(c, SchemeChange::Cleared | SchemeChange::Loaded));
        let components = all || changes.contains(&SchemeChange::Components);
        let connections = all || changes.contains(&SchemeChange::Connections);

        self.publish(HubEvent::SchemeChanged {
            components,
            connections,
        });
        self.forget_pending_requests();
        self.check_current_scheme_components();
    }

    // =========================================================================
    // COMPONENTS
    // =========================================================================

    /// Add a `<type>_<n>` component to the scheme. Returns its name.
    pub fn create_component_in_scheme(&mut self, type_name: &str, module: &str) -> Result<String, HubError> {
        let result = self.edit_scheme(|scheme| {
            let name = scheme.next_free_name(type_name);
            scheme
                .add_component(ComponentInfo::new(name.clone(), type_name, module))
                .map(|()| name)
        });
        Ok(result?)
    }

    /// Remove a component and its connections from the scheme.
    pub fn remove_component_from_scheme(&mut self, name: &str) -> Result<ComponentInfo, HubError> {
        Ok(self.edit_scheme(|scheme| scheme.remove_component(name))?)
    }

    /// Rename a component in the scheme and, if it is live, on the hub.
    pub fn rename_component(&mut self, name: &str, new_name: &str) -> Result<(), HubError> {
        let scheme = self.scheme.as_mut().ok_or(HubError::NoScheme)?;
        scheme.rename_component(name, new_name)?;

        if let Some(live) = self.components_by_name.get(name).cloned() {
            match self
                .modules
                .get_mut(&live.module)
                .map(|m| m.rename_component(name, new_name))
            {
                Some(Ok(_)) => {
                    self.components_by_name.remove(name);
                    self.components_by_name.insert(new_name.to_string(), live.clone());
                    self.publish(HubEvent::ComponentRenamed {
                        module: live.module,
                        from: name.to_string(),
                        to: new_name.to_string(),
                    });
                }
                Some(Err(e)) => warn!(component = %name, error = %e, "Live rename failed"),
                None => {}
            }
        }

        self.apply_scheme_changes();
        Ok(())
    }

    /// Copy a live component's settings into its scheme entry.
    pub fn store_component_settings(&mut self, name: &str) -> Result<(), HubError> {
        let settings = self
            .live_component(name)
            .ok_or_else(|| HubError::ComponentNotLive(name.to_string()))?
            .settings_json();
        let info = self
            .scheme
            .as_mut()
            .ok_or(HubError::NoScheme)?
            .component_mut(name)
            .ok_or_else(|| SchemeError::UnknownComponent(name.to_string()))?;
        info.settings = settings;
        Ok(())
    }

    /// Push a scheme component's stored settings onto its live component.
    pub(super) fn reload_component_settings(&mut self, name: &str) {
        let Some(settings) = self
            .scheme
            .as_ref()
            .and_then(|s| s.component(name))
            .map(|c| c.settings.clone())
        else {
            return;
        };
        if settings.is_empty() {
            return;
        }
        let Some(live) = self.components_by_name.get(name) else {
            return;
        };
        if let Some(component) = self
            .modules
            .get_mut(&live.module)
            .and_then(|m| m.component_mut(live.id))
        {
            component.apply_settings(&settings);
        }
    }

    // =========================================================================
    // CONNECTIONS
    // =========================================================================

    /// Returns `false` if the connection already exists.
    pub fn add_connection(&mut self, connection: ComponentConnection) -> bool {
        self.edit_scheme(|scheme| scheme.add_connection(connection))
    }

    pub fn remove_connection(&mut self, key: &str) -> Option<ComponentConnection> {
        self.edit_scheme(|scheme| scheme.remove_connection(key))
    }

    /// Returns `false` if no connection has this key.
    pub fn set_connection_enabled(&mut self, key: &str, enabled: bool) -> bool {
        self.edit_scheme(|scheme| scheme.set_connection_enabled(key, enabled))
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Load a scheme file. The hub is disabled first; on error the current
    /// scheme is kept.
    pub fn load_scheme(&mut self, path: &Path) -> Result<(), HubError> {
        let path = self.config.scheme_file(path);
        if self.enabled {
            self.set_enabled(false);
        }
        let mut scheme = Scheme::new();
        scheme.load(&path)?;
        scheme.warn_duplicates();
        self.scheme = Some(scheme);
        self.apply_scheme_changes();
        Ok(())
    }

    /// Save the scheme to `path`, or to the file it was loaded from.
    /// Returns the path written.
    pub fn save_scheme(&mut self, path: Option<&Path>) -> Result<PathBuf, HubError> {
        let target = match path {
            Some(path) => Some(self.config.scheme_file(path)),
            None => self.scheme.as_ref().and_then(|s| s.last_path().cloned()),
        };
        let scheme = self.scheme.as_mut().ok_or(HubError::NoScheme)?;
        let target = target.ok_or(HubError::NoScheme)?;
        scheme.save(&target)?;
        Ok(target)
    }

    pub fn clear_scheme(&mut self) {
        self.edit_scheme(Scheme::clear);
    }

    /// Load the current scheme file again. Returns `false` if there is none.
    pub fn reload_scheme(&mut self) -> Result<bool, HubError> {
        let Some(scheme) = self.scheme.as_mut() else {
            return Ok(false);
        };
        let reloaded = scheme.reload()?;
        if reloaded {
            scheme.warn_duplicates();
            self.apply_scheme_changes();
        }
        Ok(reloaded)
    }

    /// Delete a scheme file. Deleting the current file clears the scheme
    /// and disables the hub.
    pub fn delete_scheme(&mut self, path: &Path) -> Result<(), HubError> {
        let path = self.config.scheme_file(path);
        let current = self
            .scheme
            .as_ref()
            .and_then(Scheme::last_path)
            .is_some_and(|p| p == &path);
        if current {
            self.clear_scheme();
            self.set_enabled(false);
        }
        std::fs::remove_file(&path).map_err(|e| HubError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        info!(path = %path.display(), "Scheme deleted");
        Ok(())
    }
}
