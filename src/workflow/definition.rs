//! Raw action definitions
//!
//! An [`ActionDefinition`] is the stored, externally supplied form of a
//! workflow step: a `type` tag plus type-specific fields. Nested action lists
//! (conditional branches, loop bodies, try/catch blocks) stay as raw JSON
//! values until the factory materializes them into typed [`Action`]s.
//!
//! [`Action`]: super::Action

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw, unvalidated action record as stored by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Action type tag (e.g. "navigate", "loop", "template")
    #[serde(rename = "type")]
    pub action_type: String,

    /// Optional human-readable name, used in logs and results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Type-specific fields, kept raw until the factory validates them
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ActionDefinition {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            name: None,
            fields: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a raw field by name
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The name to report for this definition (explicit name, or the type tag)
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.action_type)
    }

    /// The JSON object form of this definition
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(self.action_type.clone()));
        if let Some(name) = &self.name {
            map.insert("name".to_string(), Value::String(name.clone()));
        }
        map.extend(self.fields.clone());
        Value::Object(map)
    }
}
