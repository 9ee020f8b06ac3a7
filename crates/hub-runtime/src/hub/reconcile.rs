//! Diff the scheme against live components and apply the difference.
//!
//! | Step | Action |
//! |------|--------|
//! | 1 | no scheme: delete every live component |
//! | 2 | desired `(name, type, module)` multiset, count per module |
//! | 3 | start modules with desired components, stop harvested ones without |
//! | 4 | each live component consumes the first matching desired entry, else is deleted |
//! | 5 | leftover desired entries are created |
//! | 6 | stored settings are pushed onto live components |
//! | 7 | unlink everything, relink if enabled |
//!
//! Matching is case-insensitive. Duplicate desired entries are tolerated:
//! each live component satisfies at most one of them. Create and delete
//! requests still in flight are remembered so that a second pass with no
//! change in between sends nothing new. A scheme change, a module becoming
//! ready or a module process exiting forgets them, so a request the module
//! dropped is sent again.

use super::Hub;
use hub_telemetry::{COMPONENTS_CREATED, COMPONENTS_DELETED, RECONCILIATIONS};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

type Triple = (String, String, String);

fn same(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

impl Hub {
    /// Bring live components in line with the scheme. Never fails; anything
    /// that cannot be done now is retried on the next trigger.
    pub fn check_current_scheme_components(&mut self) {
        RECONCILIATIONS.inc();

        let Some(scheme) = self.scheme.as_ref() else {
            self.delete_all_components();
            self.flush();
            return;
        };
        let mut desired: Vec<Triple> = scheme
            .components()
            .iter()
            .map(|c| (c.name.clone(), c.type_name.clone(), c.module.clone()))
            .collect();
        let per_module = scheme.component_count_by_module();

        self.control_processes(&per_module);
        self.delete_unmatched(&mut desired);
        self.create_missing(&desired);
        self.apply_scheme_settings();
        self.relink();
        self.flush();
    }

    /// Forget in-flight create and delete requests before a pass triggered
    /// by a real change.
    pub(super) fn forget_pending_requests(&mut self) {
        if !self.pending_creates.is_empty() || !self.pending_deletes.is_empty() {
            debug!(
                creates = self.pending_creates.len(),
                deletes = self.pending_deletes.len(),
                "Forgetting unanswered requests"
            );
        }
        self.pending_creates.clear();
        self.pending_deletes.clear();
    }

    fn delete_all_components(&mut self) {
        for (module, proxy) in &self.modules {
            for component in proxy.components() {
                let key = (module.clone(), component.id());
                if self.pending_deletes.contains(&key) {
                    continue;
                }
                proxy.delete_component_id(component.id());
                COMPONENTS_DELETED.inc();
                self.pending_deletes.insert(key);
            }
        }
    }

    /// Start every module the scheme needs; stop modules it does not need
    /// once their configs are cached.
    fn control_processes(&mut self, per_module: &BTreeMap<String, usize>) {
        let known: Vec<String> = self.loader.module_names().map(str::to_string).collect();
        for module in known {
            let wanted = per_module
                .iter()
                .any(|(name, count)| *count > 0 && same(name, &module));
            let result = if wanted {
                if self.module_name_like(&module).is_some() {
                    continue;
                }
                self.loader.start_module(&module)
            } else {
                if !self.configs.module_exists(&module) {
                    continue;
                }
                self.loader.stop_module(&module)
            };
            if let Err(e) = result {
                warn!(module = %module, error = %e, "Module process control failed");
            }
        }
    }

    /// Match ready components against the desired multiset, consuming
    /// matches and deleting the rest.
    fn delete_unmatched(&mut self, desired: &mut Vec<Triple>) {
        for (module, proxy) in &self.modules {
            for component in proxy.components().filter(|c| c.is_ready()) {
                let found = desired.iter().position(|(name, type_name, m)| {
                    same(name, component.name())
                        && same(type_name, component.type_name())
                        && same(m, module)
                });
                if let Some(index) = found {
                    desired.remove(index);
                    continue;
                }

                let key = (module.clone(), component.id());
                if self.pending_deletes.contains(&key) {
                    continue;
                }
                debug!(module = %module, component = %component.name(), "Deleting component not in scheme");
                proxy.delete_component_id(component.id());
                COMPONENTS_DELETED.inc();
                self.pending_deletes.insert(key);
            }
        }
    }

    /// Request the desired components nothing live matched, minus those
    /// already requested.
    fn create_missing(&mut self, desired: &[Triple]) {
        let outstanding = self.pending_creates.clone();
        let mut seen: HashMap<(String, String), usize> = HashMap::new();

        for (name, type_name, module) in desired {
            let Some(module_key) = self.module_name_like(module) else {
                debug!(module = %module, component = %name, "Module not connected, create deferred");
                continue;
            };
            let Some(proxy) = self.modules.get(&module_key).filter(|m| m.is_ready()) else {
                continue;
            };

            let key = (module_key.clone(), name.to_lowercase());
            let count = seen.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count <= outstanding.get(&key).copied().unwrap_or(0) {
                continue;
            }

            match proxy.create_component(type_name, Some(name)) {
                Ok(()) => {
                    COMPONENTS_CREATED.inc();
                    *self.pending_creates.entry(key).or_insert(0) += 1;
                }
                Err(e) => {
                    debug!(module = %module_key, component = %name, error = %e, "Create not possible");
                }
            }
        }
    }

    fn apply_scheme_settings(&mut self) {
        let names: Vec<String> = self
            .scheme
            .iter()
            .flat_map(|s| s.components())
            .filter(|c| !c.settings.is_empty())
            .map(|c| c.name.clone())
            .collect();
        for name in names {
            self.reload_component_settings(&name);
        }
    }
}
