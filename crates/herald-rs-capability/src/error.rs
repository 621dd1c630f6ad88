//! Error types for capability sessions.

use crate::session::SessionState;
use herald_rs_protocol::FailureKind;
use thiserror::Error;

/// Low-level failures reported by a connector or transport, without session context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),
    /// The server answered with something the protocol does not allow.
    #[error("malformed response: {0}")]
    Protocol(String),
    /// The server reported an error for the request.
    #[error("{0}")]
    Remote(String),
    /// The connection broke while a request was in flight.
    #[error("transport error: {0}")]
    Io(String),
}

/// Errors returned by session open, invocation, and close.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// Every connection attempt failed.
    #[error("could not reach {server} at {address} after {attempts} attempt(s): {message}")]
    Unreachable {
        server: String,
        address: String,
        attempts: u32,
        message: String,
    },
    /// The server did not answer within the deadline.
    #[error("{server} at {address} did not complete {operation} within {timeout_ms}ms")]
    Timeout {
        server: String,
        address: String,
        operation: String,
        timeout_ms: u64,
    },
    /// The server answered with a malformed response.
    #[error("{server} at {address} returned a malformed response to {operation}: {message}")]
    Protocol {
        server: String,
        address: String,
        operation: String,
        message: String,
    },
    /// The server reported an error for an action.
    #[error("{server} action `{action}` reported an error: {message}")]
    Remote {
        server: String,
        action: String,
        message: String,
    },
    /// The connection broke during an action call.
    #[error("{server} at {address} failed while calling `{action}`: {message}")]
    Transport {
        server: String,
        address: String,
        action: String,
        message: String,
    },
    /// No open session advertises the action.
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    /// Arguments do not match the declared schema.
    #[error("invalid arguments for `{action}`: {message}")]
    InvalidArguments { action: String, message: String },
    /// The session cannot accept calls in its current state.
    #[error("{server} session is {state}")]
    NotOpen { server: String, state: SessionState },
}

impl CapabilityError {
    /// Map onto the shared failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            CapabilityError::Unreachable { .. } | CapabilityError::Transport { .. } => {
                FailureKind::Connectivity
            }
            CapabilityError::Timeout { .. } => FailureKind::Timeout,
            CapabilityError::Remote { .. } => FailureKind::Upstream,
            CapabilityError::Protocol { .. }
            | CapabilityError::UnknownAction(_)
            | CapabilityError::InvalidArguments { .. }
            | CapabilityError::NotOpen { .. } => FailureKind::Protocol,
        }
    }
}
