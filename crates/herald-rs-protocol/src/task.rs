//! Inbound task request and its boundary validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// "Store a record and notify someone" request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Subject identifier of the record.
    #[serde(alias = "name")]
    pub report_name: String,
    /// Structured record payload.
    pub payload: Map<String, Value>,
    /// Address to notify.
    #[serde(alias = "destination")]
    pub email_to: String,
}

/// Errors raised while validating an inbound task request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskInputError {
    /// The body was not valid JSON or did not match the request shape.
    #[error("malformed task request: {0}")]
    Malformed(String),
    /// A specific field failed validation.
    #[error("invalid task request field `{field}`: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

impl TaskRequest {
    /// Build a request from its three fields.
    pub fn new(
        report_name: impl Into<String>,
        payload: Map<String, Value>,
        email_to: impl Into<String>,
    ) -> Self {
        Self {
            report_name: report_name.into(),
            payload,
            email_to: email_to.into(),
        }
    }

    /// Parse and validate a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, TaskInputError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|err| TaskInputError::Malformed(err.to_string()))?;
        Self::from_value(value)
    }

    /// Validate an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, TaskInputError> {
        let Value::Object(mut fields) = value else {
            return Err(TaskInputError::Malformed(
                "request body must be a JSON object".to_string(),
            ));
        };
        match fields.get("payload") {
            Some(Value::Object(_)) => {}
            Some(Value::String(raw)) => {
                // Accept a payload that arrives as a JSON-encoded object string.
                let decoded: Value =
                    serde_json::from_str(raw).map_err(|err| TaskInputError::InvalidField {
                        field: "payload",
                        message: format!("not valid JSON: {err}"),
                    })?;
                if !decoded.is_object() {
                    return Err(TaskInputError::InvalidField {
                        field: "payload",
                        message: "must be a JSON object".to_string(),
                    });
                }
                fields.insert("payload".to_string(), decoded);
            }
            Some(_) => {
                return Err(TaskInputError::InvalidField {
                    field: "payload",
                    message: "must be a JSON object".to_string(),
                });
            }
            None => {}
        }
        let request: TaskRequest = serde_json::from_value(Value::Object(fields))
            .map_err(|err| TaskInputError::Malformed(err.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    /// Reject blank identifiers.
    pub fn validate(&self) -> Result<(), TaskInputError> {
        if self.report_name.trim().is_empty() {
            return Err(TaskInputError::InvalidField {
                field: "report_name",
                message: "cannot be empty".to_string(),
            });
        }
        if self.email_to.trim().is_empty() {
            return Err(TaskInputError::InvalidField {
                field: "email_to",
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Payload rendered as compact JSON.
    pub fn payload_json(&self) -> String {
        Value::Object(self.payload.clone()).to_string()
    }

    /// Payload rendered as indented JSON.
    pub fn payload_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.payload).unwrap_or_else(|_| self.payload_json())
    }
}
