//! # Component Info
//!
//! One scheme node: the desired `(name, type, module)` triple plus the
//! settings and channel declarations the editor stored for it.

use crate::errors::SchemeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

/// A component the scheme wants to exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    /// Opaque settings blob keyed by object name.
    #[serde(default)]
    pub settings: Map<String, Json>,
    /// Declared input channels, name to type name.
    #[serde(default, with = "channel_list")]
    pub inputs: BTreeMap<String, String>,
    /// Declared output channels, name to type name.
    #[serde(default, with = "channel_list")]
    pub outputs: BTreeMap<String, String>,
}

impl ComponentInfo {
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        module: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            module: module.into(),
            enabled: true,
            x: 0,
            y: 0,
            settings: Map::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Parse one `components[]` entry. Entries without a name, type or
    /// module are rejected.
    pub fn from_json(value: Json) -> Result<Self, SchemeError> {
        let info: Self =
            serde_json::from_value(value).map_err(|e| SchemeError::Json(e.to_string()))?;
        if info.type_name.is_empty() {
            return Err(SchemeError::MissingField("type"));
        }
        if info.name.is_empty() {
            return Err(SchemeError::MissingField("name"));
        }
        if info.module.is_empty() {
            return Err(SchemeError::MissingField("module"));
        }
        Ok(info)
    }

    #[must_use]
    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or(Json::Null)
    }

    /// Case-insensitive match against a live `(name, type, module)` triple.
    #[must_use]
    pub fn matches(&self, name: &str, type_name: &str, module: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            && self.type_name.eq_ignore_ascii_case(type_name)
            && self.module.eq_ignore_ascii_case(module)
    }
}

/// `[{ "name": .., "type": .. }]` on disk, a sorted map in memory.
mod channel_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    struct Channel {
        #[serde(default)]
        name: String,
        #[serde(rename = "type", default)]
        type_name: String,
    }

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<Channel> = map
            .iter()
            .map(|(name, type_name)| Channel {
                name: name.clone(),
                type_name: type_name.clone(),
            })
            .collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, String>, D::Error> {
        let list = Vec::<Channel>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|c| (c.name, c.type_name)).collect())
    }
}
