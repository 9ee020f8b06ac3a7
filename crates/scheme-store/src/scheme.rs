//! # Scheme Graph
//!
//! Components are kept in authoring order and may contain duplicate
//! `(name, type, module)` triples when loaded from disk; see
//! [`Scheme::duplicates`]. Connections are keyed by their
//! `"A.out -> B.in"` string, so adding the same edge twice replaces it.
//!
//! ## Indexes
//!
//! ```text
//!  by_output: (component, object) ──▶ [connection key, ...]
//!  by_input:  (component, object) ──▶ [connection key, ...]
//! ```
//!
//! Both indexes are rebuilt or patched on every connection mutation and are
//! never observable in an inconsistent state.

use crate::component_info::ComponentInfo;
use crate::connection::ComponentConnection;
use crate::errors::SchemeError;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Change notifications accumulated by mutating operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeChange {
    Components,
    Connections,
    Cleared,
    Loaded,
}

type ChannelKey = (String, String);

/// The desired-state graph.
#[derive(Debug, Default)]
pub struct Scheme {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) last_path: Option<PathBuf>,
    components: Vec<ComponentInfo>,
    connections: BTreeMap<String, ComponentConnection>,
    by_output: HashMap<ChannelKey, Vec<String>>,
    by_input: HashMap<ChannelKey, Vec<String>>,
    changes: Vec<SchemeChange>,
}

impl Scheme {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Path of the last successful load or save.
    #[must_use]
    pub fn last_path(&self) -> Option<&PathBuf> {
        self.last_path.as_ref()
    }

    /// Drain the pending change notifications. Each kind appears once.
    pub fn take_changes(&mut self) -> Vec<SchemeChange> {
        std::mem::take(&mut self.changes)
    }

    pub(crate) fn note(&mut self, change: SchemeChange) {
        if !self.changes.contains(&change) {
            self.changes.push(change);
        }
    }

    // =========================================================================
    // COMPONENTS
    // =========================================================================

    #[must_use]
    pub fn components(&self) -> &[ComponentInfo] {
        &self.components
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&ComponentInfo> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut ComponentInfo> {
        self.components.iter_mut().find(|c| c.name == name)
    }

    #[must_use]
    pub fn contains_component(&self, name: &str) -> bool {
        self.component(name).is_some()
    }

    /// Case-insensitive lookup by the full triple.
    #[must_use]
    pub fn find(&self, name: &str, type_name: &str, module: &str) -> Option<&ComponentInfo> {
        self.components
            .iter()
            .find(|c| c.matches(name, type_name, module))
    }

    pub fn add_component(&mut self, info: ComponentInfo) -> Result<(), SchemeError> {
        if self.contains_component(&info.name) {
            return Err(SchemeError::NameTaken(info.name));
        }
        debug!(component = %info.name, module = %info.module, "Scheme component added");
        self.components.push(info);
        self.note(SchemeChange::Components);
        Ok(())
    }

    /// Append without the uniqueness check; used when loading from disk.
    pub(crate) fn push_component(&mut self, info: ComponentInfo) {
        self.components.push(info);
    }

    /// Remove a component and every connection that touches it.
    pub fn remove_component(&mut self, name: &str) -> Result<ComponentInfo, SchemeError> {
        let idx = self
            .components
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SchemeError::UnknownComponent(name.to_string()))?;
        let removed = self.components.remove(idx);

        let before = self.connections.len();
        self.connections.retain(|_, c| !c.touches(name));
        if self.connections.len() != before {
            self.rebuild_indexes();
        }

        info!(component = %name, connections = before - self.connections.len(), "Scheme component removed");
        self.note(SchemeChange::Components);
        self.note(SchemeChange::Connections);
        Ok(removed)
    }

    /// Rename a component and rewrite every connection endpoint naming it.
    ///
    /// Connection endpoints are compared case-insensitively.
    pub fn rename_component(&mut self, name: &str, new_name: &str) -> Result<(), SchemeError> {
        if name == new_name {
            return Ok(());
        }
        if self.contains_component(new_name) {
            return Err(SchemeError::NameTaken(new_name.to_string()));
        }
        let component = self
            .component_mut(name)
            .ok_or_else(|| SchemeError::UnknownComponent(name.to_string()))?;
        component.name = new_name.to_string();

        let mut rewritten = 0usize;
        let connections = std::mem::take(&mut self.connections);
        for (_, mut conn) in connections {
            if conn.output_component.eq_ignore_ascii_case(name) {
                conn.output_component = new_name.to_string();
                rewritten += 1;
            }
            if conn.input_component.eq_ignore_ascii_case(name) {
                conn.input_component = new_name.to_string();
                rewritten += 1;
            }
            self.connections.insert(conn.key(), conn);
        }
        self.rebuild_indexes();

        info!(from = %name, to = %new_name, endpoints = rewritten, "Scheme component renamed");
        self.note(SchemeChange::Components);
        self.note(SchemeChange::Connections);
        Ok(())
    }

    /// Smallest free `<type>_<n>` with `n >= 1`.
    #[must_use]
    pub fn next_free_name(&self, type_name: &str) -> String {
        (1usize..)
            .map(|n| format!("{type_name}_{n}"))
            .find(|candidate| !self.contains_component(candidate))
            .unwrap_or_else(|| type_name.to_string())
    }

    /// Desired component count per module name.
    #[must_use]
    pub fn component_count_by_module(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.components {
            *counts.entry(c.module.clone()).or_insert(0) += 1;
        }
        counts
    }

    // =========================================================================
    // CONNECTIONS
    // =========================================================================

    pub fn connections(&self) -> impl Iterator<Item = &ComponentConnection> {
        self.connections.values()
    }

    #[must_use]
    pub fn connection(&self, key: &str) -> Option<&ComponentConnection> {
        self.connections.get(key)
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Insert a connection. Returns `false` when it replaced an existing
    /// edge with the same endpoints.
    pub fn add_connection(&mut self, connection: ComponentConnection) -> bool {
        let key = connection.key();
        let fresh = if let Some(old) = self.connections.remove(&key) {
            self.unindex(&key, &old);
            false
        } else {
            true
        };
        self.index(&key, &connection);
        self.connections.insert(key, connection);
        self.note(SchemeChange::Connections);
        fresh
    }

    pub fn remove_connection(&mut self, key: &str) -> Option<ComponentConnection> {
        let removed = self.connections.remove(key)?;
        self.unindex(key, &removed);
        self.note(SchemeChange::Connections);
        Some(removed)
    }

    /// Toggle one connection. Returns `false` for an unknown key.
    pub fn set_connection_enabled(&mut self, key: &str, enabled: bool) -> bool {
        match self.connections.get_mut(key) {
            Some(conn) => {
                if conn.enabled != enabled {
                    conn.enabled = enabled;
                    self.note(SchemeChange::Connections);
                }
                true
            }
            None => false,
        }
    }

    /// Connections whose output is `component.object`.
    #[must_use]
    pub fn connections_from(&self, component: &str, object: &str) -> Vec<&ComponentConnection> {
        self.lookup(&self.by_output, component, object)
    }

    /// Connections whose input is `component.object`.
    #[must_use]
    pub fn connections_to(&self, component: &str, object: &str) -> Vec<&ComponentConnection> {
        self.lookup(&self.by_input, component, object)
    }

    fn lookup(
        &self,
        index: &HashMap<ChannelKey, Vec<String>>,
        component: &str,
        object: &str,
    ) -> Vec<&ComponentConnection> {
        index
            .get(&(component.to_string(), object.to_string()))
            .map(|keys| keys.iter().filter_map(|k| self.connections.get(k)).collect())
            .unwrap_or_default()
    }

    fn index(&mut self, key: &str, conn: &ComponentConnection) {
        self.by_output
            .entry(conn.output_key())
            .or_default()
            .push(key.to_string());
        self.by_input
            .entry(conn.input_key())
            .or_default()
            .push(key.to_string());
    }

    fn unindex(&mut self, key: &str, conn: &ComponentConnection) {
        for (index, channel) in [
            (&mut self.by_output, conn.output_key()),
            (&mut self.by_input, conn.input_key()),
        ] {
            if let Some(keys) = index.get_mut(&channel) {
                keys.retain(|k| k != key);
                if keys.is_empty() {
                    index.remove(&channel);
                }
            }
        }
    }

    fn rebuild_indexes(&mut self) {
        self.by_output.clear();
        self.by_input.clear();
        let entries: Vec<(String, ComponentConnection)> = self
            .connections
            .iter()
            .map(|(k, c)| (k.clone(), c.clone()))
            .collect();
        for (key, conn) in &entries {
            self.index(key, conn);
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Drop every component and connection and forget the loaded path.
    pub fn clear(&mut self) {
        self.components.clear();
        self.connections.clear();
        self.by_output.clear();
        self.by_input.clear();
        self.description.clear();
        self.last_path = None;
        self.note(SchemeChange::Components);
        self.note(SchemeChange::Connections);
        self.note(SchemeChange::Cleared);
    }

    /// Triples that appear more than once; tolerated, reported for linting.
    #[must_use]
    pub fn duplicates(&self) -> Vec<(String, String, String)> {
        let mut seen: HashMap<(String, String, String), usize> = HashMap::new();
        for c in &self.components {
            let key = (
                c.name.to_lowercase(),
                c.type_name.to_lowercase(),
                c.module.to_lowercase(),
            );
            *seen.entry(key).or_insert(0) += 1;
        }
        let mut dups: Vec<_> = seen
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(k, _)| k)
            .collect();
        dups.sort();
        dups
    }

    /// Log every duplicate triple once. Returns how many were reported.
    pub fn warn_duplicates(&self) -> usize {
        let dups = self.duplicates();
        for (name, type_name, module) in &dups {
            warn!(
                component = %name,
                class = %type_name,
                module = %module,
                "Scheme lists the same component more than once"
            );
        }
        dups.len()
    }
}
