//! Session manager: connect with retry, fetch the catalog once, hand out sessions.

use crate::error::{CapabilityError, TransportError};
use crate::session::{CapabilitySession, duration_ms};
use crate::transport::{CapabilityConnector, CapabilityEndpoint, CapabilityTransport};
use herald_rs_config::GatewayConfig;
use herald_rs_protocol::ActionDescriptor;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Deadlines and retry budget used when opening sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Deadline for each connect attempt, the catalog fetch, and each invocation.
    pub call_timeout: Duration,
    /// Connection attempts before giving up. Treated as at least one.
    pub attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl ConnectPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            call_timeout: config.timeouts.call_timeout(),
            attempts: config.retry.connect_attempts,
            backoff: config.retry.backoff(),
        }
    }
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

type CatalogCache = Arc<RwLock<HashMap<String, Arc<Vec<ActionDescriptor>>>>>;

/// Opens capability sessions on behalf of task invocations.
#[derive(Clone)]
pub struct SessionManager {
    connector: Arc<dyn CapabilityConnector>,
    policy: ConnectPolicy,
    /// Catalogs keyed by address, populated only when reuse across sessions is enabled.
    shared_catalogs: Option<CatalogCache>,
}

impl SessionManager {
    /// Create a manager that fetches a fresh catalog for every session.
    pub fn new(connector: Arc<dyn CapabilityConnector>, policy: ConnectPolicy) -> Self {
        Self {
            connector,
            policy,
            shared_catalogs: None,
        }
    }

    /// Allow catalogs fetched by earlier sessions to be reused for the same address.
    pub fn with_catalog_reuse(mut self, enabled: bool) -> Self {
        self.shared_catalogs = enabled.then(CatalogCache::default);
        self
    }

    pub fn policy(&self) -> &ConnectPolicy {
        &self.policy
    }

    /// Drop every catalog remembered across sessions.
    pub fn invalidate_catalogs(&self) {
        if let Some(cache) = &self.shared_catalogs {
            cache.write().clear();
        }
    }

    /// Open a session: connect within the retry budget, then fetch the catalog.
    ///
    /// On failure the partially opened session is closed before returning.
    pub async fn open(
        &self,
        endpoint: CapabilityEndpoint,
    ) -> Result<CapabilitySession, CapabilityError> {
        let mut session = CapabilitySession::connecting(endpoint, self.policy.call_timeout);
        match self.establish(&mut session).await {
            Ok(()) => {
                info!(
                    "opened capability session (name={}, address={}, actions={})",
                    session.name(),
                    session.address(),
                    session.actions().len()
                );
                Ok(session)
            }
            Err(err) => {
                session.mark_failed();
                session.close().await;
                Err(err)
            }
        }
    }

    async fn establish(&self, session: &mut CapabilitySession) -> Result<(), CapabilityError> {
        let transport = self.connect_with_retry(session.endpoint()).await?;
        session.attach(transport);
        let Some(transport) = session.transport() else {
            return Err(CapabilityError::NotOpen {
                server: session.name().to_string(),
                state: session.state(),
            });
        };
        let catalog = self.fetch_catalog(session.endpoint(), transport).await?;
        session.set_catalog(catalog);
        Ok(())
    }

    async fn connect_with_retry(
        &self,
        endpoint: &CapabilityEndpoint,
    ) -> Result<Box<dyn CapabilityTransport>, CapabilityError> {
        let attempts = self.policy.attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            debug!(
                "connecting to capability server (name={}, address={}, attempt={}/{})",
                endpoint.name, endpoint.address, attempt, attempts
            );
            let outcome =
                tokio::time::timeout(self.policy.call_timeout, self.connector.connect(endpoint))
                    .await;
            match outcome {
                Ok(Ok(transport)) => return Ok(transport),
                Ok(Err(TransportError::Connect(message) | TransportError::Io(message))) => {
                    warn!(
                        "connect attempt failed (name={}, attempt={}/{}): {}",
                        endpoint.name, attempt, attempts, message
                    );
                    last_error = Some(CapabilityError::Unreachable {
                        server: endpoint.name.clone(),
                        address: endpoint.address.clone(),
                        attempts,
                        message,
                    });
                }
                Ok(Err(err)) => {
                    return Err(CapabilityError::Protocol {
                        server: endpoint.name.clone(),
                        address: endpoint.address.clone(),
                        operation: "initialize".to_string(),
                        message: err.to_string(),
                    });
                }
                Err(_) => {
                    warn!(
                        "connect attempt timed out (name={}, attempt={}/{})",
                        endpoint.name, attempt, attempts
                    );
                    last_error = Some(CapabilityError::Timeout {
                        server: endpoint.name.clone(),
                        address: endpoint.address.clone(),
                        operation: "connect".to_string(),
                        timeout_ms: duration_ms(self.policy.call_timeout),
                    });
                }
            }
            if attempt < attempts && !self.policy.backoff.is_zero() {
                tokio::time::sleep(self.policy.backoff).await;
            }
        }
        Err(last_error.unwrap_or_else(|| CapabilityError::Unreachable {
            server: endpoint.name.clone(),
            address: endpoint.address.clone(),
            attempts,
            message: "no connection attempt was made".to_string(),
        }))
    }

    async fn fetch_catalog(
        &self,
        endpoint: &CapabilityEndpoint,
        transport: &dyn CapabilityTransport,
    ) -> Result<Arc<Vec<ActionDescriptor>>, CapabilityError> {
        if let Some(cache) = &self.shared_catalogs
            && let Some(catalog) = cache.read().get(&endpoint.address).cloned()
        {
            debug!(
                "reusing cached catalog (name={}, actions={})",
                endpoint.name,
                catalog.len()
            );
            return Ok(catalog);
        }

        let fetched =
            tokio::time::timeout(self.policy.call_timeout, transport.list_actions()).await;
        let actions = match fetched {
            Ok(Ok(actions)) => actions,
            Ok(Err(err)) => {
                return Err(CapabilityError::Protocol {
                    server: endpoint.name.clone(),
                    address: endpoint.address.clone(),
                    operation: "catalog fetch".to_string(),
                    message: err.to_string(),
                });
            }
            Err(_) => {
                return Err(CapabilityError::Timeout {
                    server: endpoint.name.clone(),
                    address: endpoint.address.clone(),
                    operation: "catalog fetch".to_string(),
                    timeout_ms: duration_ms(self.policy.call_timeout),
                });
            }
        };

        let mut seen = std::collections::HashSet::new();
        for action in &actions {
            if !seen.insert(action.name.as_str()) {
                return Err(CapabilityError::Protocol {
                    server: endpoint.name.clone(),
                    address: endpoint.address.clone(),
                    operation: "catalog fetch".to_string(),
                    message: format!("duplicate action name `{}`", action.name),
                });
            }
        }

        let catalog: Arc<Vec<ActionDescriptor>> = Arc::new(
            actions
                .into_iter()
                .map(|action| action.with_server(endpoint.name.clone()))
                .collect(),
        );
        debug!(
            "fetched catalog (name={}, actions={})",
            endpoint.name,
            catalog.len()
        );
        if let Some(cache) = &self.shared_catalogs {
            cache
                .write()
                .insert(endpoint.address.clone(), catalog.clone());
        }
        Ok(catalog)
    }
}
