//! Tool-selection loop driven by a chat model with function calling.

use super::{SelectionOutcome, SelectionRequest, ToolSelector};
use crate::error::SelectionError;
use crate::prompt::TOOL_REQUIRED_NUDGE;
use async_trait::async_trait;
use autoagents_llm::chat::{ChatMessage, ChatRole, FunctionTool, MessageType, Tool};
use autoagents_llm::{FunctionCall, LLMProvider, ToolCall};
use herald_rs_protocol::ActionDescriptor;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Runs the model in a loop: every tool call it returns is executed through
/// the catalog and fed back until it answers with text only.
#[derive(Clone)]
pub struct LlmToolSelector {
    provider: Arc<dyn LLMProvider>,
}

impl LlmToolSelector {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ToolSelector for LlmToolSelector {
    fn name(&self) -> &str {
        "llm"
    }

    async fn run(&self, request: SelectionRequest<'_>) -> Result<SelectionOutcome, SelectionError> {
        let tools: Vec<Tool> = request.catalog.descriptors().map(to_llm_tool).collect();
        let mut messages = vec![
            ChatMessage {
                role: ChatRole::System,
                message_type: MessageType::Text,
                content: request.instructions.to_string(),
            },
            ChatMessage {
                role: ChatRole::User,
                message_type: MessageType::Text,
                content: request.task.to_string(),
            },
        ];
        let turn_timeout_ms = u64::try_from(request.turn_timeout.as_millis()).unwrap_or(u64::MAX);
        let mut nudged = false;

        for turn in 1..=request.max_turns {
            let (text, calls) = {
                let response = tokio::time::timeout(
                    request.turn_timeout,
                    self.provider
                        .chat_with_tools(&messages, Some(tools.as_slice()), None),
                )
                .await
                .map_err(|_| SelectionError::OracleTimeout(turn_timeout_ms))?
                .map_err(|err| SelectionError::Oracle(err.to_string()))?;
                (
                    response.text().unwrap_or_default(),
                    response.tool_calls().unwrap_or_default(),
                )
            };
            debug!(
                "planner turn (turn={}, tool_calls={}, invoked={})",
                turn,
                calls.len(),
                request.catalog.invocation_count()
            );

            if calls.is_empty() {
                let untouched = request.catalog.invocation_count() == 0;
                if request.tool_choice.is_required() && untouched {
                    if nudged {
                        warn!("planner answered twice without invoking any action");
                        return Ok(SelectionOutcome::Incomplete(format!(
                            "model answered without invoking any action: {text}"
                        )));
                    }
                    nudged = true;
                    messages.push(ChatMessage {
                        role: ChatRole::Assistant,
                        message_type: MessageType::Text,
                        content: text,
                    });
                    messages.push(ChatMessage {
                        role: ChatRole::User,
                        message_type: MessageType::Text,
                        content: TOOL_REQUIRED_NUDGE.to_string(),
                    });
                    continue;
                }
                info!("planner finished (turns={turn})");
                return Ok(SelectionOutcome::Completed(text));
            }

            messages.push(ChatMessage {
                role: ChatRole::Assistant,
                message_type: MessageType::ToolUse(calls.clone()),
                content: String::new(),
            });
            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                let arguments = parse_arguments(&call.function.name, &call.function.arguments)?;
                let value = request
                    .catalog
                    .invoke(&call.function.name, arguments)
                    .await?;
                results.push(tool_result(call, &value));
            }
            messages.push(ChatMessage {
                role: ChatRole::Tool,
                message_type: MessageType::ToolResult(results),
                content: String::new(),
            });
        }

        Err(SelectionError::TurnLimit(request.max_turns))
    }
}

fn to_llm_tool(descriptor: &ActionDescriptor) -> Tool {
    Tool {
        tool_type: "function".to_string(),
        function: FunctionTool {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            parameters: descriptor.parameters(),
        },
    }
}

/// Tool-call arguments arrive as a JSON object encoded in a string.
fn parse_arguments(action: &str, raw: &str) -> Result<Map<String, Value>, SelectionError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(arguments)) => Ok(arguments),
        Ok(other) => Err(SelectionError::MalformedCall {
            action: action.to_string(),
            message: format!("arguments must be a JSON object, got {other}"),
        }),
        Err(err) => Err(SelectionError::MalformedCall {
            action: action.to_string(),
            message: err.to_string(),
        }),
    }
}

fn tool_result(call: &ToolCall, value: &Value) -> ToolCall {
    ToolCall {
        id: call.id.clone(),
        call_type: call.call_type.clone(),
        function: FunctionCall {
            name: call.function.name.clone(),
            arguments: value.to_string(),
        },
    }
}
