//! Backend router: one task in, one normalized result out.

use crate::catalog::ActionCatalog;
use crate::error::OrchestrationError;
use crate::prompt;
use crate::selector::{SelectionOutcome, SelectionRequest, ToolSelector};
use crate::webhook::WebhookDelegate;
use futures_util::FutureExt;
use herald_rs_capability::{
    CapabilityEndpoint, CapabilitySession, ConnectPolicy, McpConnector, SessionManager,
};
use herald_rs_config::GatewayConfig;
use herald_rs_protocol::{
    BackendMode, FailureKind, HealthReport, OrchestrationResult, TaskRequest, ToolChoice,
};
use log::{debug, info, warn};
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Logical names of the two capability servers.
pub const STORAGE_SERVER: &str = "storage";
pub const NOTIFICATION_SERVER: &str = "notification";

/// Routes each task to the webhook, when configured, or to the
/// storage and notification capability servers.
///
/// The routing configuration is fixed at construction. [`submit`](Self::submit)
/// never returns an error: every failure becomes a failed
/// [`OrchestrationResult`].
pub struct Orchestrator {
    config: Arc<GatewayConfig>,
    webhook: Option<WebhookDelegate>,
    sessions: SessionManager,
    selector: Arc<dyn ToolSelector>,
    instructions: String,
}

impl Orchestrator {
    pub fn new(
        config: Arc<GatewayConfig>,
        sessions: SessionManager,
        selector: Arc<dyn ToolSelector>,
    ) -> Self {
        let webhook = config
            .routing
            .webhook()
            .map(|url| WebhookDelegate::new(url, config.timeouts.call_timeout()));
        let instructions = prompt::instructions(config.agent.instructions.as_deref());
        info!(
            "orchestrator ready (backend={}, planner={}, tool_choice={})",
            config.backend_mode(),
            selector.name(),
            config.agent.tool_choice
        );
        Self {
            config,
            webhook,
            sessions,
            selector,
            instructions,
        }
    }

    /// Router backed by MCP capability servers over streamable HTTP.
    pub fn with_mcp(config: Arc<GatewayConfig>, selector: Arc<dyn ToolSelector>) -> Self {
        let sessions = SessionManager::new(
            Arc::new(McpConnector::new()),
            ConnectPolicy::from_config(&config),
        )
        .with_catalog_reuse(config.agent.reuse_catalog_across_sessions);
        Self::new(config, sessions, selector)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn backend_mode(&self) -> BackendMode {
        if self.webhook.is_some() {
            BackendMode::Webhook
        } else {
            BackendMode::DualSession
        }
    }

    pub fn tool_choice(&self) -> ToolChoice {
        self.config.agent.tool_choice
    }

    pub fn health(&self) -> HealthReport {
        HealthReport::ok(self.backend_mode(), self.tool_choice())
    }

    /// Parse a raw request body and submit it. Malformed input is an `input` failure.
    pub async fn submit_json(&self, body: &[u8]) -> OrchestrationResult {
        match TaskRequest::from_slice(body) {
            Ok(request) => self.submit(request).await,
            Err(err) => {
                debug!("rejected task request: {err}");
                OrchestrationError::from(err).into_result()
            }
        }
    }

    /// Fulfil one task and return its single result.
    pub async fn submit(&self, request: TaskRequest) -> OrchestrationResult {
        if let Err(err) = request.validate() {
            return OrchestrationError::from(err).into_result();
        }
        let routed = AssertUnwindSafe(self.route(&request)).catch_unwind().await;
        let result = match routed {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => err.into_result(),
            Err(_) => OrchestrationError::protocol("task execution panicked").into_result(),
        };
        if result.success {
            info!("task fulfilled (report_name={})", request.report_name);
        } else {
            warn!(
                "task failed (report_name={}): {}",
                request.report_name,
                result.message()
            );
        }
        result
    }

    async fn route(&self, request: &TaskRequest) -> Result<OrchestrationResult, OrchestrationError> {
        match &self.webhook {
            Some(webhook) => {
                debug!("routing task to webhook (url={})", webhook.url());
                webhook.deliver(request).await
            }
            None => {
                debug!("routing task to capability servers");
                self.run_dual_session(request).await
            }
        }
    }

    async fn run_dual_session(
        &self,
        request: &TaskRequest,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let routing = &self.config.routing;
        let (storage, notification) = tokio::join!(
            self.sessions.open(CapabilityEndpoint::new(
                STORAGE_SERVER,
                routing.storage_url.clone()
            )),
            self.sessions.open(CapabilityEndpoint::new(
                NOTIFICATION_SERVER,
                routing.notification_url.clone()
            )),
        );
        let (mut storage, mut notification) = match (storage, notification) {
            (Ok(storage), Ok(notification)) => (storage, notification),
            (Err(err), Ok(mut other)) | (Ok(mut other), Err(err)) => {
                other.close().await;
                return Err(err.into());
            }
            (Err(err), Err(_)) => return Err(err.into()),
        };

        let outcome = self.drive(request, &storage, &notification).await;
        storage.close().await;
        notification.close().await;
        outcome
    }

    async fn drive(
        &self,
        request: &TaskRequest,
        storage: &CapabilitySession,
        notification: &CapabilitySession,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let catalog = ActionCatalog::from_sessions(&[storage, notification])?;
        let task = prompt::task_description(request);
        let tool_choice = self.tool_choice();
        debug!(
            "starting tool-selection loop (planner={}, actions={:?})",
            self.selector.name(),
            catalog.names()
        );
        let selection = SelectionRequest {
            instructions: &self.instructions,
            task: &task,
            request,
            catalog: &catalog,
            tool_choice,
            max_turns: self.config.agent.max_turns,
            turn_timeout: self.config.timeouts.planner_turn_timeout(),
        };
        let outcome = AssertUnwindSafe(self.selector.run(selection))
            .catch_unwind()
            .await
            .map_err(|_| OrchestrationError::protocol("tool-selection loop panicked"))??;

        let text = match outcome {
            SelectionOutcome::Completed(text) => text,
            SelectionOutcome::Incomplete(reason) => {
                return Err(OrchestrationError::new(
                    FailureKind::Upstream,
                    format!("tool-selection loop could not complete the task: {reason}"),
                ));
            }
        };
        if tool_choice.is_required() && catalog.invocation_count() == 0 {
            return Err(OrchestrationError::protocol(
                "tool use is required but the tool-selection loop finished without invoking any action",
            ));
        }

        let invocations = catalog.invocations();
        let outcome = if text.trim().is_empty() {
            format!(
                "Task completed after {} action invocation(s).",
                invocations.len()
            )
        } else {
            text
        };
        Ok(OrchestrationResult::succeeded(outcome).with_data(json!({
            "invocations": invocations,
        })))
    }
}
