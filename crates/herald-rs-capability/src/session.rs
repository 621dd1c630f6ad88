//! A single capability session and its lifecycle.

use crate::error::{CapabilityError, TransportError};
use crate::transport::{CapabilityEndpoint, CapabilityTransport};
use herald_rs_protocol::ActionDescriptor;
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a capability session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live connection to one capability server with its cached action catalog.
///
/// Sessions are owned by a single task invocation and never shared. The
/// catalog is fetched once when the session opens and is not refreshed while
/// the session lives. Callers must [`close`](CapabilitySession::close) the
/// session; a session dropped while still connected schedules a best-effort
/// close on the current runtime.
pub struct CapabilitySession {
    endpoint: CapabilityEndpoint,
    transport: Option<Box<dyn CapabilityTransport>>,
    catalog: Arc<Vec<ActionDescriptor>>,
    state: RwLock<SessionState>,
    call_timeout: Duration,
}

impl CapabilitySession {
    /// Create a session in the `connecting` state.
    pub(crate) fn connecting(endpoint: CapabilityEndpoint, call_timeout: Duration) -> Self {
        Self {
            endpoint,
            transport: None,
            catalog: Arc::new(Vec::new()),
            state: RwLock::new(SessionState::Connecting),
            call_timeout,
        }
    }

    pub(crate) fn attach(&mut self, transport: Box<dyn CapabilityTransport>) {
        self.transport = Some(transport);
    }

    pub(crate) fn transport(&self) -> Option<&dyn CapabilityTransport> {
        self.transport.as_deref()
    }

    pub(crate) fn set_catalog(&mut self, catalog: Arc<Vec<ActionDescriptor>>) {
        self.catalog = catalog;
        *self.state.write() = SessionState::Open;
    }

    pub(crate) fn mark_failed(&self) {
        *self.state.write() = SessionState::Failed;
    }

    /// Logical server name.
    pub fn name(&self) -> &str {
        &self.endpoint.name
    }

    /// Server address.
    pub fn address(&self) -> &str {
        &self.endpoint.address
    }

    pub fn endpoint(&self) -> &CapabilityEndpoint {
        &self.endpoint
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Cached action catalog. Never triggers a remote round trip.
    pub fn list_actions(&self) -> Arc<Vec<ActionDescriptor>> {
        self.catalog.clone()
    }

    /// Borrow the cached action catalog.
    pub fn actions(&self) -> &[ActionDescriptor] {
        &self.catalog
    }

    /// Look up a cached action by name.
    pub fn action(&self, name: &str) -> Option<&ActionDescriptor> {
        self.catalog.iter().find(|action| action.name == name)
    }

    /// Invoke a cataloged action, bounded by the call timeout.
    pub async fn invoke(
        &self,
        action: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, CapabilityError> {
        let state = self.state();
        let transport = match (state, self.transport.as_deref()) {
            (SessionState::Open, Some(transport)) => transport,
            _ => {
                return Err(CapabilityError::NotOpen {
                    server: self.endpoint.name.clone(),
                    state,
                });
            }
        };
        if self.action(action).is_none() {
            return Err(CapabilityError::UnknownAction(action.to_string()));
        }

        debug!(
            "invoking action (server={}, action={}, args={})",
            self.endpoint.name,
            action,
            arguments.len()
        );
        let result =
            tokio::time::timeout(self.call_timeout, transport.call_action(action, arguments))
                .await;
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(TransportError::Remote(message))) => Err(CapabilityError::Remote {
                server: self.endpoint.name.clone(),
                action: action.to_string(),
                message,
            }),
            Ok(Err(TransportError::Protocol(message))) => Err(CapabilityError::Protocol {
                server: self.endpoint.name.clone(),
                address: self.endpoint.address.clone(),
                operation: format!("call `{action}`"),
                message,
            }),
            Ok(Err(TransportError::Connect(message) | TransportError::Io(message))) => {
                warn!(
                    "transport failed during action (server={}, action={})",
                    self.endpoint.name, action
                );
                self.mark_failed();
                Err(CapabilityError::Transport {
                    server: self.endpoint.name.clone(),
                    address: self.endpoint.address.clone(),
                    action: action.to_string(),
                    message,
                })
            }
            Err(_) => Err(CapabilityError::Timeout {
                server: self.endpoint.name.clone(),
                address: self.endpoint.address.clone(),
                operation: format!("call `{action}`"),
                timeout_ms: duration_ms(self.call_timeout),
            }),
        }
    }

    /// Release the transport. Idempotent; failures are logged and swallowed.
    pub async fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            match tokio::time::timeout(self.call_timeout, transport.close()).await {
                Ok(Ok(())) => info!(
                    "closed capability session (name={}, address={})",
                    self.endpoint.name, self.endpoint.address
                ),
                Ok(Err(err)) => warn!(
                    "failed to close capability session (name={}, address={}): {}",
                    self.endpoint.name, self.endpoint.address, err
                ),
                Err(_) => warn!(
                    "timed out closing capability session (name={}, address={})",
                    self.endpoint.name, self.endpoint.address
                ),
            }
        }
        *self.state.write() = SessionState::Closed;
    }
}

impl fmt::Debug for CapabilitySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySession")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .field("actions", &self.catalog.len())
            .finish()
    }
}

impl Drop for CapabilitySession {
    fn drop(&mut self) {
        let Some(transport) = self.transport.take() else {
            return;
        };
        let name = self.endpoint.name.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("capability session dropped while open, closing in background (name={name})");
                handle.spawn(async move {
                    if let Err(err) = transport.close().await {
                        warn!("background close failed (name={name}): {err}");
                    }
                });
            }
            Err(_) => warn!("capability session dropped outside a runtime (name={name})"),
        }
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
