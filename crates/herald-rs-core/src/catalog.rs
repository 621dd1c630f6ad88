//! Flat action catalog spanning every open capability session.

use herald_rs_capability::{CapabilityError, CapabilitySession};
use herald_rs_protocol::ActionDescriptor;
use log::debug;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};

/// One invocation made through the catalog, in call order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionInvocation {
    pub action: String,
    pub server: String,
    pub arguments: Map<String, Value>,
    /// Remote result, absent when the invocation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct CatalogEntry<'a> {
    descriptor: ActionDescriptor,
    session: &'a CapabilitySession,
}

/// Actions from several sessions, merged under unique names.
///
/// Every call from a tool-selection loop goes through
/// [`ActionCatalog::invoke`], which rejects unknown names and arguments the
/// schema does not allow before anything reaches the wire.
pub struct ActionCatalog<'a> {
    entries: Vec<CatalogEntry<'a>>,
    invocations: Mutex<Vec<ActionInvocation>>,
}

impl<'a> ActionCatalog<'a> {
    /// Merge the cached catalogs of the given sessions.
    pub fn from_sessions(sessions: &[&'a CapabilitySession]) -> Result<Self, CapabilityError> {
        let mut entries: Vec<CatalogEntry<'a>> = Vec::new();
        for session in sessions {
            for descriptor in session.actions() {
                if let Some(existing) = entries
                    .iter()
                    .find(|entry| entry.descriptor.name == descriptor.name)
                {
                    return Err(CapabilityError::Protocol {
                        server: session.name().to_string(),
                        address: session.address().to_string(),
                        operation: "catalog merge".to_string(),
                        message: format!(
                            "action `{}` is also advertised by {}",
                            descriptor.name,
                            existing.session.name()
                        ),
                    });
                }
                entries.push(CatalogEntry {
                    descriptor: descriptor.clone(),
                    session,
                });
            }
        }
        Ok(Self {
            entries,
            invocations: Mutex::new(Vec::new()),
        })
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ActionDescriptor> {
        self.entries.iter().map(|entry| &entry.descriptor)
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors()
            .map(|descriptor| descriptor.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ActionDescriptor> {
        self.descriptors().find(|descriptor| descriptor.name == name)
    }

    /// First action matching the predicate, in catalog order.
    pub fn find<P>(&self, predicate: P) -> Option<&ActionDescriptor>
    where
        P: Fn(&ActionDescriptor) -> bool,
    {
        self.descriptors().find(|descriptor| predicate(descriptor))
    }

    /// Validate and invoke an action on the session that owns it.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, CapabilityError> {
        let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.descriptor.name == name)
        else {
            return Err(CapabilityError::UnknownAction(name.to_string()));
        };
        validate_arguments(&entry.descriptor, &arguments).map_err(|message| {
            CapabilityError::InvalidArguments {
                action: name.to_string(),
                message,
            }
        })?;

        debug!(
            "catalog invoke (action={}, server={}, args={})",
            name,
            entry.session.name(),
            arguments.len()
        );
        let outcome = entry.session.invoke(name, arguments.clone()).await;
        let (result, error) = match &outcome {
            Ok(value) => (Some(value.clone()), None),
            Err(err) => (None, Some(err.to_string())),
        };
        self.invocations.lock().push(ActionInvocation {
            action: name.to_string(),
            server: entry.session.name().to_string(),
            arguments,
            result,
            error,
        });
        outcome
    }

    /// Ordered trace of invocations made so far.
    pub fn invocations(&self) -> Vec<ActionInvocation> {
        self.invocations.lock().clone()
    }

    /// Number of invocations that reached a server, successful or not.
    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().len()
    }
}

/// Check named arguments against a descriptor's input schema.
///
/// Covers what planners get wrong in practice: missing required arguments,
/// undeclared arguments, and top-level type mismatches. Values are never
/// coerced.
pub fn validate_arguments(
    descriptor: &ActionDescriptor,
    arguments: &Map<String, Value>,
) -> Result<(), String> {
    let schema = &descriptor.input_schema;
    let properties = schema.get("properties").and_then(Value::as_object);
    let open = schema
        .get("additionalProperties")
        .and_then(Value::as_bool)
        .unwrap_or(properties.is_none());

    for required in descriptor.required() {
        if !arguments.contains_key(required) {
            return Err(format!("missing required argument `{required}`"));
        }
    }

    for (name, value) in arguments {
        let Some(property) = properties.and_then(|props| props.get(name)) else {
            if open {
                continue;
            }
            return Err(format!("argument `{name}` is not declared"));
        };
        if let Some(expected) = property.get("type")
            && !matches_type(expected, value)
        {
            return Err(format!(
                "argument `{name}` should be {}, got {}",
                describe_type(expected),
                json_type_name(value)
            ));
        }
    }
    Ok(())
}

fn matches_type(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => matches_type_name(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| matches_type_name(name, value)),
        _ => true,
    }
}

fn matches_type_name(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" | "),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn insert_report() -> ActionDescriptor {
        ActionDescriptor::new(
            "insert_report",
            json!({
                "type": "object",
                "properties": {
                    "report_name": { "type": "string" },
                    "payload": { "type": "object" }
                },
                "required": ["report_name", "payload"]
            }),
        )
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn accepts_declared_arguments() {
        let result = validate_arguments(
            &insert_report(),
            &args(json!({ "report_name": "Q1", "payload": { "sales": 100 } })),
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn rejects_missing_required_argument() {
        let result = validate_arguments(&insert_report(), &args(json!({ "report_name": "Q1" })));
        assert_eq!(
            result,
            Err("missing required argument `payload`".to_string())
        );
    }

    #[test]
    fn rejects_undeclared_argument() {
        let result = validate_arguments(
            &insert_report(),
            &args(json!({ "report_name": "Q1", "payload": {}, "owner": "me" })),
        );
        assert_eq!(result, Err("argument `owner` is not declared".to_string()));
    }

    #[test]
    fn does_not_coerce_types() {
        let result = validate_arguments(
            &insert_report(),
            &args(json!({ "report_name": "Q1", "payload": "{\"sales\": 100}" })),
        );
        assert_eq!(
            result,
            Err("argument `payload` should be object, got string".to_string())
        );

        let limit = ActionDescriptor::new(
            "list_reports",
            json!({ "type": "object", "properties": { "limit": { "type": "integer" } } }),
        );
        assert!(validate_arguments(&limit, &args(json!({ "limit": 2.5 }))).is_err());
        assert!(validate_arguments(&limit, &args(json!({ "limit": 5 }))).is_ok());
    }

    #[test]
    fn schema_without_properties_is_open() {
        let descriptor = ActionDescriptor::new("ping", json!({ "type": "object" }));
        assert_eq!(
            validate_arguments(&descriptor, &args(json!({ "anything": true }))),
            Ok(())
        );
    }

    #[test]
    fn union_types_accept_any_member() {
        let descriptor = ActionDescriptor::new(
            "tag",
            json!({
                "type": "object",
                "properties": { "label": { "type": ["string", "null"] } }
            }),
        );
        assert!(validate_arguments(&descriptor, &args(json!({ "label": null }))).is_ok());
        assert_eq!(
            validate_arguments(&descriptor, &args(json!({ "label": 3 }))),
            Err("argument `label` should be string | null, got integer".to_string())
        );
    }
}
