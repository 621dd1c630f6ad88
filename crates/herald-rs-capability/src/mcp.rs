//! MCP connector over streamable HTTP, built on `rmcp`.

use crate::error::TransportError;
use crate::transport::{CapabilityConnector, CapabilityEndpoint, CapabilityTransport};
use async_trait::async_trait;
use herald_rs_protocol::{ActionDescriptor, SideEffect};
use log::debug;
use rmcp::service::{Peer, RunningService};
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::{RoleClient, ServiceError, ServiceExt};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tokio::sync::Mutex;

/// Connects to MCP servers that speak the streamable HTTP transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpConnector;

impl McpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CapabilityConnector for McpConnector {
    async fn connect(
        &self,
        endpoint: &CapabilityEndpoint,
    ) -> Result<Box<dyn CapabilityTransport>, TransportError> {
        let transport = StreamableHttpClientTransport::from_uri(endpoint.address.as_str());
        let service = ()
            .serve(transport)
            .await
            .map_err(|err| classify_connect_error(&err))?;
        debug!("mcp handshake complete (name={})", endpoint.name);
        Ok(Box::new(McpTransport::new(service)))
    }
}

/// Running MCP client session.
struct McpTransport {
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
}

impl McpTransport {
    fn new(service: RunningService<RoleClient, ()>) -> Self {
        Self {
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        }
    }
}

#[async_trait]
impl CapabilityTransport for McpTransport {
    async fn list_actions(&self) -> Result<Vec<ActionDescriptor>, TransportError> {
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(map_service_error)?;
        tools
            .iter()
            .map(|tool| {
                let value = serde_json::to_value(tool)
                    .map_err(|err| TransportError::Protocol(err.to_string()))?;
                descriptor_from_tool(&value)
            })
            .collect()
    }

    async fn call_action(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, TransportError> {
        let params = serde_json::from_value(json!({
            "name": name,
            "arguments": arguments,
        }))
        .map_err(|err| TransportError::Protocol(err.to_string()))?;
        let result = self
            .peer
            .call_tool(params)
            .await
            .map_err(map_service_error)?;
        let value =
            serde_json::to_value(&result).map_err(|err| TransportError::Protocol(err.to_string()))?;
        value_from_call_result(value)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let service = self.service.lock().await.take();
        if let Some(service) = service {
            service
                .cancel()
                .await
                .map_err(|err| TransportError::Io(err.to_string()))?;
        }
        Ok(())
    }
}

fn map_service_error(err: ServiceError) -> TransportError {
    match err {
        ServiceError::McpError(data) => TransportError::Remote(data.message.to_string()),
        other => TransportError::Io(other.to_string()),
    }
}

/// Markers of a request that never reached the server. rmcp wraps the
/// transport error without a `source()` chain, so the debug rendering is the
/// only place the inner reqwest/hyper error survives.
const UNREACHABLE_MARKERS: &[&str] = &[
    "error sending request",
    "tcp connect error",
    "connecterror",
    "connection refused",
    "connectionrefused",
    "dns error",
    "failed to lookup address",
    "network is unreachable",
    "kind: timedout",
];

/// Tell an unreachable server apart from a reachable one that broke the handshake.
fn classify_connect_error(err: &(dyn StdError + 'static)) -> TransportError {
    let message = err.to_string();
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(current) = source {
        if let Some(http) = current.downcast_ref::<reqwest::Error>()
            && (http.is_connect() || http.is_timeout())
        {
            return TransportError::Connect(message);
        }
        if let Some(io) = current.downcast_ref::<std::io::Error>()
            && matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::AddrNotAvailable
            )
        {
            return TransportError::Connect(message);
        }
        source = current.source();
    }
    let rendered = format!("{message}\n{err:?}").to_ascii_lowercase();
    if UNREACHABLE_MARKERS
        .iter()
        .any(|marker| rendered.contains(marker))
    {
        TransportError::Connect(message)
    } else {
        TransportError::Protocol(message)
    }
}

/// Map a serialized MCP tool definition onto an action descriptor.
pub(crate) fn descriptor_from_tool(tool: &Value) -> Result<ActionDescriptor, TransportError> {
    let name = tool
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| TransportError::Protocol("tool definition without a name".to_string()))?;
    let schema = match tool.get("inputSchema") {
        Some(schema @ Value::Object(_)) => schema.clone(),
        None | Some(Value::Null) => json!({ "type": "object", "properties": {} }),
        Some(_) => {
            return Err(TransportError::Protocol(format!(
                "tool `{name}` has a non-object input schema"
            )));
        }
    };
    let read_only = tool
        .pointer("/annotations/readOnlyHint")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let side_effect = if read_only {
        SideEffect::Read
    } else {
        SideEffect::Write
    };
    let description = tool
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok(ActionDescriptor::new(name, schema)
        .with_description(description)
        .with_side_effect(side_effect))
}

/// Extract the action result from a serialized MCP call result.
pub(crate) fn value_from_call_result(result: Value) -> Result<Value, TransportError> {
    let texts: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        let message = if texts.is_empty() {
            "remote action failed".to_string()
        } else {
            texts.join("\n")
        };
        return Err(TransportError::Remote(message));
    }

    if let Some(structured) = result.get("structuredContent").filter(|v| !v.is_null()) {
        return Ok(unwrap_result_envelope(structured.clone()));
    }

    let mut values: Vec<Value> = texts
        .into_iter()
        .map(|text| serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
        .collect();
    match values.len() {
        0 => Ok(Value::Null),
        1 => Ok(values.remove(0)),
        _ => Ok(Value::Array(values)),
    }
}

/// Servers wrap non-object structured results as `{"result": ...}`.
fn unwrap_result_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("result") => {
            map.remove("result").unwrap_or(Value::Null)
        }
        other => other,
    }
}
