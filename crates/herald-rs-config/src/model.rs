//! Configuration schema for Herald.

use herald_rs_protocol::{BackendMode, ToolChoice};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root config for the Herald gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl GatewayConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }

    /// Backend path selected by the routing section.
    pub fn backend_mode(&self) -> BackendMode {
        self.routing.backend_mode()
    }
}

/// Builder for assembling a `GatewayConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
        }
    }

    /// Route every task to the given webhook.
    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.config.routing.webhook_url = Some(url.into());
        self
    }

    /// Set the storage provider address.
    pub fn storage_url(mut self, url: impl Into<String>) -> Self {
        self.config.routing.storage_url = url.into();
        self
    }

    /// Set the notification provider address.
    pub fn notification_url(mut self, url: impl Into<String>) -> Self {
        self.config.routing.notification_url = url.into();
        self
    }

    /// Set the per-call timeout in milliseconds.
    pub fn call_timeout_ms(mut self, millis: u64) -> Self {
        self.config.timeouts.call_timeout_ms = millis;
        self
    }

    /// Replace the retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Replace the agent configuration.
    pub fn agent(mut self, agent: AgentConfig) -> Self {
        self.config.agent = agent;
        self
    }

    /// Replace the server configuration.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Finalize and return the built `GatewayConfig`.
    pub fn build(self) -> GatewayConfig {
        self.config
    }
}

/// Backend addresses. A non-blank webhook address wins over the capability servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_storage_url")]
    pub storage_url: String,
    #[serde(default = "default_notification_url")]
    pub notification_url: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            storage_url: default_storage_url(),
            notification_url: default_notification_url(),
        }
    }
}

impl RoutingConfig {
    /// Configured webhook address, ignoring blank values.
    pub fn webhook(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn backend_mode(&self) -> BackendMode {
        if self.webhook().is_some() {
            BackendMode::Webhook
        } else {
            BackendMode::DualSession
        }
    }
}

fn default_storage_url() -> String {
    "http://localhost:8001/mcp".to_string()
}

fn default_notification_url() -> String {
    "http://localhost:8002/mcp".to_string()
}

/// Deadlines for outbound calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Webhook call, session open attempt, catalog fetch, and each action invocation.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Each decision turn of the tool-selection loop.
    #[serde(default = "default_planner_turn_timeout_ms")]
    pub planner_turn_timeout_ms: u64,
    /// Gateway client round trip.
    #[serde(default = "default_client_timeout_ms")]
    pub client_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            planner_turn_timeout_ms: default_planner_turn_timeout_ms(),
            client_timeout_ms: default_client_timeout_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn planner_turn_timeout(&self) -> Duration {
        Duration::from_millis(self.planner_turn_timeout_ms)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout_ms)
    }
}

fn default_call_timeout_ms() -> u64 {
    15_000
}

fn default_planner_turn_timeout_ms() -> u64 {
    60_000
}

fn default_client_timeout_ms() -> u64 {
    30_000
}

/// Session-open retry budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            connect_attempts: default_connect_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    200
}

/// Which tool-selection loop drives the dual-session path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerKind {
    /// Language-model driven loop.
    #[default]
    Llm,
    /// Fixed store-then-notify plan, no model required.
    Deterministic,
}

impl PlannerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlannerKind::Llm => "llm",
            PlannerKind::Deterministic => "deterministic",
        }
    }
}

/// Tool-selection loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default)]
    pub planner: PlannerKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub tool_choice: ToolChoice,
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Allow a catalog fetched by an earlier session to be reused for the same address.
    #[serde(default)]
    pub reuse_catalog_across_sessions: bool,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            planner: PlannerKind::default(),
            model: default_model(),
            tool_choice: ToolChoice::default(),
            max_turns: default_max_turns(),
            reuse_catalog_across_sessions: false,
            instructions: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_turns() -> usize {
    8
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}
