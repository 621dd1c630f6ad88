//! Tool-selection loop contract and its implementations.

mod deterministic;
mod llm;

pub use deterministic::DeterministicSelector;
pub use llm::LlmToolSelector;

use crate::catalog::ActionCatalog;
use crate::error::SelectionError;
use async_trait::async_trait;
use herald_rs_protocol::{TaskRequest, ToolChoice};
use std::time::Duration;

/// Everything a tool-selection loop is given for one task.
pub struct SelectionRequest<'a> {
    pub instructions: &'a str,
    /// Natural-language task text.
    pub task: &'a str,
    /// Structured request the task text was built from.
    pub request: &'a TaskRequest,
    /// Actions across every open session. All calls go through it.
    pub catalog: &'a ActionCatalog<'a>,
    pub tool_choice: ToolChoice,
    pub max_turns: usize,
    /// Deadline for each oracle turn.
    pub turn_timeout: Duration,
}

/// How a loop ended when it did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The loop judged the task satisfied and produced its final outcome.
    Completed(String),
    /// The loop gave up and explains why.
    Incomplete(String),
}

/// Decides which actions to invoke, in what order, and when the task is done.
#[async_trait]
pub trait ToolSelector: Send + Sync {
    /// Short label for logs and health output.
    fn name(&self) -> &str;

    async fn run(&self, request: SelectionRequest<'_>) -> Result<SelectionOutcome, SelectionError>;
}
