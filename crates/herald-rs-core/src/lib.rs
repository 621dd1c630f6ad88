//! Orchestration core for Herald.
//!
//! The [`Orchestrator`] routes each task either to a workflow-engine webhook
//! or to a pair of capability sessions driven by a [`ToolSelector`]. It owns
//! session lifetimes for the duration of one task and normalizes every
//! outcome into an [`OrchestrationResult`](herald_rs_protocol::OrchestrationResult).

pub mod catalog;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod selector;
pub mod webhook;

pub use catalog::{ActionCatalog, ActionInvocation, validate_arguments};
pub use error::{OrchestrationError, SelectionError};
pub use orchestrator::{NOTIFICATION_SERVER, Orchestrator, STORAGE_SERVER};
pub use selector::{
    DeterministicSelector, LlmToolSelector, SelectionOutcome, SelectionRequest, ToolSelector,
};
pub use webhook::WebhookDelegate;
