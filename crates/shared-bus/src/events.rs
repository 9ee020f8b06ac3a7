//! # Hub Events
//!
//! Lifecycle notifications the hub publishes for observers (UI, scripting,
//! tooling). Observers never drive the hub through the bus; commands go
//! through the runtime's command channel.

use serde::{Deserialize, Serialize};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubEvent {
    // =========================================================================
    // MODULES
    // =========================================================================
    /// A module transport connected and identified itself.
    ModuleConnected { module: String },

    /// Every class prototype of the module finished negotiating.
    ModuleReady { module: String },

    /// The module transport went away.
    ModuleRemoved { module: String },

    // =========================================================================
    // COMPONENTS
    // =========================================================================
    /// A live component reached Ready for the first time.
    ComponentAdded {
        module: String,
        component: String,
        type_name: String,
    },

    /// A ready component re-negotiated its objects or service info.
    ComponentChanged { module: String, component: String },

    ComponentRenamed {
        module: String,
        from: String,
        to: String,
    },

    ComponentKilled { module: String, component: String },

    // =========================================================================
    // MESSAGES
    // =========================================================================
    /// Free text sent by a module, tagged with the component when known.
    ModuleMessage {
        module: String,
        component: Option<String>,
        text: String,
    },

    // =========================================================================
    // SCHEME
    // =========================================================================
    /// The scheme's components or connections changed.
    SchemeChanged { components: bool, connections: bool },

    /// Linking was globally enabled or disabled.
    EnableChanged { enabled: bool },

    /// A module's component config cache was (re)written.
    ConfigWritten { module: String },
}

impl HubEvent {
    /// Get the topic for this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::ModuleConnected { .. } | Self::ModuleReady { .. } | Self::ModuleRemoved { .. } => {
                EventTopic::Modules
            }
            Self::ComponentAdded { .. }
            | Self::ComponentChanged { .. }
            | Self::ComponentRenamed { .. }
            | Self::ComponentKilled { .. } => EventTopic::Components,
            Self::ModuleMessage { .. } => EventTopic::Messages,
            Self::SchemeChanged { .. } | Self::EnableChanged { .. } | Self::ConfigWritten { .. } => {
                EventTopic::Scheme
            }
        }
    }

    /// Module the event concerns, if any.
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::ModuleConnected { module }
            | Self::ModuleReady { module }
            | Self::ModuleRemoved { module }
            | Self::ComponentAdded { module, .. }
            | Self::ComponentChanged { module, .. }
            | Self::ComponentRenamed { module, .. }
            | Self::ComponentKilled { module, .. }
            | Self::ModuleMessage { module, .. }
            | Self::ConfigWritten { module } => Some(module),
            Self::SchemeChanged { .. } | Self::EnableChanged { .. } => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Modules,
    Components,
    Scheme,
    Messages,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Modules to include. Empty means all modules; module-less events
    /// always pass this check.
    pub modules: Vec<String>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            modules: Vec::new(),
        }
    }

    /// Create a filter for events concerning specific modules.
    #[must_use]
    pub fn from_modules(modules: Vec<String>) -> Self {
        Self {
            topics: Vec::new(),
            modules,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &HubEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let module_match = self.modules.is_empty()
            || event
                .module()
                .map_or(true, |m| self.modules.iter().any(|f| f == m));

        topic_match && module_match
    }
}
