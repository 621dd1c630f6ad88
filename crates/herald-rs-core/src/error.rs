//! Error types for the orchestration core.

use herald_rs_capability::CapabilityError;
use herald_rs_protocol::{FailureKind, OrchestrationResult, TaskInputError};
use thiserror::Error;

/// Errors raised by a tool-selection loop.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// An action invocation failed; the loop aborts on the first one.
    #[error(transparent)]
    Action(#[from] CapabilityError),
    /// The decision oracle reported an error.
    #[error("decision oracle failed: {0}")]
    Oracle(String),
    /// The decision oracle did not answer within its turn deadline.
    #[error("decision oracle did not answer within {0}ms")]
    OracleTimeout(u64),
    /// The loop ran out of turns before producing an outcome.
    #[error("tool-selection loop exceeded {0} turns without finishing")]
    TurnLimit(usize),
    /// The oracle produced a tool call the core cannot execute.
    #[error("malformed tool call `{action}`: {message}")]
    MalformedCall { action: String, message: String },
}

impl SelectionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SelectionError::Action(err) => err.kind(),
            SelectionError::Oracle(_) => FailureKind::Upstream,
            SelectionError::OracleTimeout(_) => FailureKind::Timeout,
            SelectionError::TurnLimit(_) | SelectionError::MalformedCall { .. } => {
                FailureKind::Protocol
            }
        }
    }
}

/// A classified failure on its way to becoming an [`OrchestrationResult`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct OrchestrationError {
    pub kind: FailureKind,
    pub message: String,
}

impl OrchestrationError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Protocol, message)
    }

    /// Convert into the failed result returned to the caller.
    pub fn into_result(self) -> OrchestrationResult {
        let detail = self.to_string();
        OrchestrationResult::failed(self.kind, detail)
    }
}

impl From<CapabilityError> for OrchestrationError {
    fn from(err: CapabilityError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<SelectionError> for OrchestrationError {
    fn from(err: SelectionError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<TaskInputError> for OrchestrationError {
    fn from(err: TaskInputError) -> Self {
        Self::new(FailureKind::Input, err.to_string())
    }
}
