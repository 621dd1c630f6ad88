use super::{SelectionOutcome, SelectionRequest, ToolSelector};
use crate::error::SelectionError;
use crate::prompt::notification_subject;
use async_trait::async_trait;
use herald_rs_protocol::SideEffect;
use log::info;
use serde_json::{Map, Value};

const STORE_ARGUMENTS: [&str; 2] = ["report_name", "payload"];
const NOTIFY_ARGUMENTS: [&str; 3] = ["to", "subject", "text"];

/// Fixed two-step plan: store the report, then notify with the stored id.
///
/// Actions are picked by the arguments they accept, not by name, so any
/// storage and notification servers with compatible schemas work.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicSelector;

impl DeterministicSelector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolSelector for DeterministicSelector {
    fn name(&self) -> &str {
        "deterministic"
    }

    async fn run(&self, request: SelectionRequest<'_>) -> Result<SelectionOutcome, SelectionError> {
        let catalog = request.catalog;
        let task = request.request;

        let Some(store) = catalog.find(|action| {
            action.side_effect == SideEffect::Write && action.accepts_all(&STORE_ARGUMENTS)
        }) else {
            return Ok(SelectionOutcome::Incomplete(
                "no action accepts report_name and payload".to_string(),
            ));
        };
        let Some(notify) = catalog.find(|action| action.accepts_all(&NOTIFY_ARGUMENTS)) else {
            return Ok(SelectionOutcome::Incomplete(
                "no action accepts to, subject and text".to_string(),
            ));
        };
        let store_name = store.name.clone();
        let notify_name = notify.name.clone();

        let mut arguments = Map::new();
        arguments.insert(
            "report_name".to_string(),
            Value::String(task.report_name.clone()),
        );
        arguments.insert("payload".to_string(), Value::Object(task.payload.clone()));
        let stored = catalog.invoke(&store_name, arguments).await?;
        let Some(id) = record_id(&stored) else {
            return Ok(SelectionOutcome::Incomplete(format!(
                "`{store_name}` returned no id: {stored}"
            )));
        };

        let body = format!(
            "Report '{}' was stored with id {}.\n\nPayload:\n{}",
            task.report_name,
            id,
            task.payload_pretty()
        );
        let mut arguments = Map::new();
        arguments.insert("to".to_string(), Value::String(task.email_to.clone()));
        arguments.insert(
            "subject".to_string(),
            Value::String(notification_subject(task)),
        );
        arguments.insert("text".to_string(), Value::String(body));
        catalog.invoke(&notify_name, arguments).await?;

        info!(
            "deterministic plan finished (store={}, notify={}, id={})",
            store_name, notify_name, id
        );
        Ok(SelectionOutcome::Completed(format!(
            "Report '{}' stored with id {}; notification sent to {}.",
            task.report_name, id, task.email_to
        )))
    }
}

fn record_id(stored: &Value) -> Option<String> {
    match stored.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
