//! Action descriptors advertised by capability servers.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Declared side effect of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    Read,
    #[default]
    Write,
}

/// A remote operation exposed by a capability session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Action name, unique within its session.
    pub name: String,
    /// Free-form description shown to the tool-selection loop.
    #[serde(default)]
    pub description: String,
    /// JSON schema for the named arguments.
    pub input_schema: Value,
    /// Declared side effect category.
    #[serde(default)]
    pub side_effect: SideEffect,
    /// Name of the session that owns the action.
    #[serde(default)]
    pub server: String,
}

impl ActionDescriptor {
    /// Create a write action with the given schema.
    pub fn new(name: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema,
            side_effect: SideEffect::Write,
            server: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_side_effect(mut self, side_effect: SideEffect) -> Self {
        self.side_effect = side_effect;
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Declared argument names.
    pub fn properties(&self) -> Vec<&str> {
        self.input_schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Argument names the schema marks as required.
    pub fn required(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether the schema declares every one of the given arguments.
    pub fn accepts_all(&self, names: &[&str]) -> bool {
        let props = self.properties();
        names.iter().all(|name| props.contains(name))
    }

    /// Schema with an empty object fallback, as handed to planners.
    pub fn parameters(&self) -> Value {
        if self.input_schema.is_object() {
            self.input_schema.clone()
        } else {
            json!({ "type": "object", "properties": {} })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn descriptor_reports_properties_and_required() {
        let descriptor = ActionDescriptor::new(
            "send_email",
            json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string" },
                    "subject": { "type": "string" },
                    "text": { "type": "string" }
                },
                "required": ["to", "subject"]
            }),
        );
        let mut props = descriptor.properties();
        props.sort();
        assert_eq!(props, vec!["subject", "text", "to"]);
        assert_eq!(descriptor.required(), vec!["to", "subject"]);
        assert!(descriptor.accepts_all(&["to", "text"]));
        assert!(!descriptor.accepts_all(&["to", "cc"]));
    }

    #[test]
    fn non_object_schema_falls_back_to_empty_parameters() {
        let descriptor = ActionDescriptor::new("ping", Value::Null);
        assert_eq!(
            descriptor.parameters(),
            json!({ "type": "object", "properties": {} })
        );
        assert!(descriptor.properties().is_empty());
    }
}
