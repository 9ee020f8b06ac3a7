//! # Component Connection
//!
//! One scheme edge. Endpoints are component and object *names*; the Hub
//! resolves them against whatever components are live at link time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directed edge from an output object to an input object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConnection {
    #[serde(rename = "outputModuleName", default)]
    pub output_component: String,
    #[serde(rename = "outputModuleType", default)]
    pub output_component_type: String,
    #[serde(rename = "outputName", default)]
    pub output_name: String,
    #[serde(rename = "outputType", default)]
    pub output_type: String,
    #[serde(rename = "inputModuleName", default)]
    pub input_component: String,
    #[serde(rename = "inputModuleType", default)]
    pub input_component_type: String,
    #[serde(rename = "inputName", default)]
    pub input_name: String,
    #[serde(rename = "inputType", default)]
    pub input_type: String,
    /// Recommended minimum interval in ms; 0 defers to the publisher.
    #[serde(rename = "RMIP", default)]
    pub rmip: u32,
    #[serde(default = "enabled_by_default", skip_serializing_if = "is_enabled")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_enabled(enabled: &bool) -> bool {
    *enabled
}

impl ComponentConnection {
    pub fn new(
        output: (&str, &str),
        input: (&str, &str),
        rmip: u32,
    ) -> Self {
        Self {
            output_component: output.0.to_string(),
            output_component_type: String::new(),
            output_name: output.1.to_string(),
            output_type: String::new(),
            input_component: input.0.to_string(),
            input_component_type: String::new(),
            input_name: input.1.to_string(),
            input_type: String::new(),
            rmip,
            enabled: true,
        }
    }

    /// `"A.out -> B.in"`; unique per connection within a scheme.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }

    #[must_use]
    pub fn output_key(&self) -> (String, String) {
        (self.output_component.clone(), self.output_name.clone())
    }

    #[must_use]
    pub fn input_key(&self) -> (String, String) {
        (self.input_component.clone(), self.input_name.clone())
    }

    #[must_use]
    pub fn touches(&self, component: &str) -> bool {
        self.output_component.eq_ignore_ascii_case(component)
            || self.input_component.eq_ignore_ascii_case(component)
    }
}

impl fmt::Display for ComponentConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.output_component, self.output_name, self.input_component, self.input_name
        )
    }
}
