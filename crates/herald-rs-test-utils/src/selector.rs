use async_trait::async_trait;
use herald_rs_core::{SelectionError, SelectionOutcome, SelectionRequest, ToolSelector};
use herald_rs_protocol::ToolChoice;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type ArgumentsFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;
type OutcomeFn = Arc<dyn Fn(&[Value]) -> String + Send + Sync>;

/// One step of a scripted plan. Closures see the results of earlier invocations.
#[derive(Clone)]
pub enum ScriptStep {
    Invoke { action: String, arguments: ArgumentsFn },
    Finish(OutcomeFn),
    GiveUp(String),
    Fail(String),
    Panic(String),
}

/// What the selector was handed on a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenRequest {
    pub task: String,
    pub actions: Vec<String>,
    pub tool_choice: ToolChoice,
}

/// Deterministic stand-in for the decision oracle.
///
/// Runs its steps in order against the catalog and stops at the first step
/// that ends the run. A script without a terminal step finishes with an empty
/// outcome.
#[derive(Clone, Default)]
pub struct ScriptedSelector {
    steps: Vec<ScriptStep>,
    runs: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl ScriptedSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke an action with fixed arguments.
    pub fn invoke(self, action: &str, arguments: Value) -> Self {
        self.invoke_with(action, move |_| arguments.clone())
    }

    /// Invoke an action with arguments computed from earlier results.
    pub fn invoke_with<F>(mut self, action: &str, arguments: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.steps.push(ScriptStep::Invoke {
            action: action.to_string(),
            arguments: Arc::new(arguments),
        });
        self
    }

    pub fn finish(self, outcome: &str) -> Self {
        let outcome = outcome.to_string();
        self.finish_with(move |_| outcome.clone())
    }

    pub fn finish_with<F>(mut self, outcome: F) -> Self
    where
        F: Fn(&[Value]) -> String + Send + Sync + 'static,
    {
        self.steps.push(ScriptStep::Finish(Arc::new(outcome)));
        self
    }

    pub fn give_up(mut self, reason: &str) -> Self {
        self.steps.push(ScriptStep::GiveUp(reason.to_string()));
        self
    }

    pub fn fail(mut self, message: &str) -> Self {
        self.steps.push(ScriptStep::Fail(message.to_string()));
        self
    }

    pub fn panic(mut self, message: &str) -> Self {
        self.steps.push(ScriptStep::Panic(message.to_string()));
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl ToolSelector for ScriptedSelector {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, request: SelectionRequest<'_>) -> Result<SelectionOutcome, SelectionError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(SeenRequest {
            task: request.task.to_string(),
            actions: request
                .catalog
                .names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            tool_choice: request.tool_choice,
        });

        let mut results: Vec<Value> = Vec::new();
        for step in &self.steps {
            match step {
                ScriptStep::Invoke { action, arguments } => {
                    let arguments = match arguments(&results) {
                        Value::Object(map) => map,
                        _ => Map::new(),
                    };
                    let value = request.catalog.invoke(action, arguments).await?;
                    results.push(value);
                }
                ScriptStep::Finish(outcome) => {
                    return Ok(SelectionOutcome::Completed(outcome(&results)));
                }
                ScriptStep::GiveUp(reason) => {
                    return Ok(SelectionOutcome::Incomplete(reason.clone()));
                }
                ScriptStep::Fail(message) => return Err(SelectionError::Oracle(message.clone())),
                ScriptStep::Panic(message) => panic!("{message}"),
            }
        }
        Ok(SelectionOutcome::Completed(String::new()))
    }
}
