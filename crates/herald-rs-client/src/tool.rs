use crate::client::GatewayClient;
use async_trait::async_trait;
use autoagents_core::tool::{ToolCallError, ToolRuntime, ToolT};
use serde_json::{Value, json};

pub const GATEWAY_TOOL_NAME: &str = "store_report_and_notify";

const DESCRIPTION: &str = "Store a report in the database and send an email notification. \
Pass the report payload as a JSON string in payload_json (e.g. '{\"sales\": 100}').";

/// Agent tool backed by [`GatewayClient`]. Always returns a string value.
#[derive(Debug, Clone)]
pub struct GatewayTool {
    client: GatewayClient,
}

impl GatewayTool {
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolRuntime for GatewayTool {
    async fn execute(&self, args: Value) -> Result<Value, ToolCallError> {
        let field = |name: &str| {
            args.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        // Accept an inline object as well as the documented JSON string.
        let payload_json = match args.get("payload_json") {
            Some(Value::String(raw)) => raw.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let message = self
            .client
            .store_report_and_notify(&field("report_name"), &payload_json, &field("email_to"))
            .await;
        Ok(Value::String(message))
    }
}

impl ToolT for GatewayTool {
    fn name(&self) -> &str {
        GATEWAY_TOOL_NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "report_name": { "type": "string", "description": "Name of the report." },
                "payload_json": {
                    "type": "string",
                    "description": "JSON string for the report payload."
                },
                "email_to": {
                    "type": "string",
                    "description": "Email address to send the notification to."
                }
            },
            "required": ["report_name", "payload_json", "email_to"]
        })
    }
}
