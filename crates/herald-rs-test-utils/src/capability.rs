use crate::fixtures::{notification_actions, storage_actions};
use async_trait::async_trait;
use herald_rs_capability::{
    CapabilityConnector, CapabilityEndpoint, CapabilityTransport, TransportError,
};
use herald_rs_protocol::ActionDescriptor;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

type Handler =
    Arc<dyn Fn(&str, &Map<String, Value>) -> Result<Value, TransportError> + Send + Sync>;

/// In-memory capability server served by [`FakeConnector`].
#[derive(Clone)]
pub struct FakeServer {
    actions: Vec<ActionDescriptor>,
    handler: Handler,
    refuse_first: usize,
    hang_connect: bool,
    catalog_error: Option<String>,
    call_delay: Option<Duration>,
}

impl FakeServer {
    pub fn new(actions: Vec<ActionDescriptor>) -> Self {
        Self {
            actions,
            handler: Arc::new(|_, _| Ok(json!({ "ok": true }))),
            refuse_first: 0,
            hang_connect: false,
            catalog_error: None,
            call_delay: None,
        }
    }

    /// Storage server whose `insert_report` hands out ids starting at `first_id`.
    pub fn storage(first_id: u64) -> Self {
        let next_id = Arc::new(AtomicU64::new(first_id));
        Self::new(storage_actions()).with_handler(move |action, arguments| match action {
            "insert_report" => Ok(json!({
                "id": next_id.fetch_add(1, Ordering::SeqCst),
                "report_name": arguments.get("report_name").cloned().unwrap_or(Value::Null),
            })),
            "list_reports" => Ok(json!([])),
            other => Err(TransportError::Remote(format!("unknown tool {other}"))),
        })
    }

    pub fn notification() -> Self {
        Self::new(notification_actions()).with_handler(|action, arguments| match action {
            "send_email" => Ok(json!({
                "status": "sent",
                "to": arguments.get("to").cloned().unwrap_or(Value::Null),
            })),
            other => Err(TransportError::Remote(format!("unknown tool {other}"))),
        })
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &Map<String, Value>) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        self.handler = Arc::new(handler);
        self
    }

    /// Refuse every connection attempt.
    pub fn refusing(mut self) -> Self {
        self.refuse_first = usize::MAX;
        self
    }

    /// Refuse the first `attempts` connection attempts, then accept.
    pub fn refusing_first(mut self, attempts: usize) -> Self {
        self.refuse_first = attempts;
        self
    }

    /// Accept the TCP connection but never finish the handshake.
    pub fn hanging(mut self) -> Self {
        self.hang_connect = true;
        self
    }

    /// Answer the catalog request with a malformed response.
    pub fn with_malformed_catalog(mut self, message: impl Into<String>) -> Self {
        self.catalog_error = Some(message.into());
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Make one action report a remote error.
    pub fn failing_action(mut self, action: &str, message: &str) -> Self {
        let inner = self.handler.clone();
        let action = action.to_string();
        let message = message.to_string();
        self.handler = Arc::new(move |name, arguments| {
            if name == action {
                Err(TransportError::Remote(message.clone()))
            } else {
                inner(name, arguments)
            }
        });
        self
    }
}

/// An action call as it reached a fake server.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub server: String,
    pub action: String,
    pub arguments: Map<String, Value>,
}

#[derive(Default)]
struct Counters {
    connect_attempts: Mutex<HashMap<String, usize>>,
    opened: AtomicUsize,
    catalog_fetches: AtomicUsize,
    closes: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

/// Connector that serves [`FakeServer`]s by address and counts every interaction.
///
/// Addresses without a registered server refuse connections.
#[derive(Clone, Default)]
pub struct FakeConnector {
    servers: Arc<Mutex<HashMap<String, FakeServer>>>,
    counters: Arc<Counters>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(self, address: impl Into<String>, server: FakeServer) -> Self {
        self.servers.lock().insert(address.into(), server);
        self
    }

    /// Connection attempts across every address.
    pub fn connect_attempts(&self) -> usize {
        self.counters.connect_attempts.lock().values().sum()
    }

    pub fn connect_attempts_to(&self, address: &str) -> usize {
        self.counters
            .connect_attempts
            .lock()
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// Successful connections.
    pub fn sessions_opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn catalog_fetches(&self) -> usize {
        self.counters.catalog_fetches.load(Ordering::SeqCst)
    }

    /// Transports closed, each counted once.
    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.counters.calls.lock().clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.counters
            .calls
            .lock()
            .iter()
            .map(|call| call.action.clone())
            .collect()
    }
}

#[async_trait]
impl CapabilityConnector for FakeConnector {
    async fn connect(
        &self,
        endpoint: &CapabilityEndpoint,
    ) -> Result<Box<dyn CapabilityTransport>, TransportError> {
        let attempt = {
            let mut attempts = self.counters.connect_attempts.lock();
            let count = attempts.entry(endpoint.address.clone()).or_insert(0);
            *count += 1;
            *count
        };
        let server = self.servers.lock().get(&endpoint.address).cloned();
        let Some(server) = server else {
            return Err(TransportError::Connect(format!(
                "connection refused: {}",
                endpoint.address
            )));
        };
        if server.hang_connect {
            std::future::pending::<()>().await;
        }
        if attempt <= server.refuse_first {
            return Err(TransportError::Connect(format!(
                "connection refused: {}",
                endpoint.address
            )));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeTransport {
            name: endpoint.name.clone(),
            server,
            counters: self.counters.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

struct FakeTransport {
    name: String,
    server: FakeServer,
    counters: Arc<Counters>,
    closed: AtomicBool,
}

#[async_trait]
impl CapabilityTransport for FakeTransport {
    async fn list_actions(&self) -> Result<Vec<ActionDescriptor>, TransportError> {
        self.counters.catalog_fetches.fetch_add(1, Ordering::SeqCst);
        match &self.server.catalog_error {
            Some(message) => Err(TransportError::Protocol(message.clone())),
            None => Ok(self.server.actions.clone()),
        }
    }

    async fn call_action(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, TransportError> {
        self.counters.calls.lock().push(RecordedCall {
            server: self.name.clone(),
            action: name.to_string(),
            arguments: arguments.clone(),
        });
        if let Some(delay) = self.server.call_delay {
            tokio::time::sleep(delay).await;
        }
        (self.server.handler)(name, &arguments)
    }

    async fn close(&self) -> Result<(), TransportError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
