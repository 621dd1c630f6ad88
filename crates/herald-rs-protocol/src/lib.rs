//! Wire protocol types for Herald task requests, results, and health reports.

mod action;
mod failure;
mod task;

pub use action::{ActionDescriptor, SideEffect};
pub use failure::FailureKind;
pub use task::{TaskInputError, TaskRequest};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Name reported by the health surface.
pub const AGENT_NAME: &str = "herald";

/// The single normalized outcome produced for every task request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    /// Whether the task was fulfilled.
    pub success: bool,
    /// Human-readable outcome text, present on success.
    pub outcome: Option<String>,
    /// Failure detail naming the kind and the offending address or operation.
    pub detail: Option<String>,
    /// Failure category, present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    /// Structured payload returned by the backend, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl OrchestrationResult {
    /// Build a successful result carrying outcome text.
    pub fn succeeded(outcome: impl Into<String>) -> Self {
        Self {
            success: true,
            outcome: Some(outcome.into()),
            detail: None,
            kind: None,
            data: None,
        }
    }

    /// Build a failed result carrying a failure kind and detail.
    pub fn failed(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            outcome: None,
            detail: Some(detail.into()),
            kind: Some(kind),
            data: None,
        }
    }

    /// Attach a structured payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// True when the result carries the text its success flag promises.
    pub fn is_well_formed(&self) -> bool {
        if self.success {
            self.outcome.is_some()
        } else {
            self.detail.is_some() && self.kind.is_some()
        }
    }

    /// Outcome text on success, detail on failure.
    pub fn message(&self) -> &str {
        let text = if self.success {
            self.outcome.as_deref()
        } else {
            self.detail.as_deref()
        };
        text.unwrap_or_default()
    }
}

/// Which backend path the router executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    /// Delegate to the workflow-engine webhook.
    Webhook,
    /// Coordinate the storage and notification capability servers.
    DualSession,
}

impl BackendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Webhook => "webhook",
            BackendMode::DualSession => "dual_session",
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool-use policy handed to the tool-selection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// At least one action must be invoked before the loop may finish.
    #[default]
    Required,
    /// The loop may answer without invoking any action.
    Auto,
}

impl ToolChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolChoice::Required => "required",
            ToolChoice::Auto => "auto",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, ToolChoice::Required)
    }
}

impl fmt::Display for ToolChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only operational status of the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub agent: String,
    pub backend: BackendMode,
    pub tool_choice: ToolChoice,
}

impl HealthReport {
    /// Report a healthy gateway running in the given mode.
    pub fn ok(backend: BackendMode, tool_choice: ToolChoice) -> Self {
        Self {
            status: "ok".to_string(),
            agent: AGENT_NAME.to_string(),
            backend,
            tool_choice,
        }
    }
}
