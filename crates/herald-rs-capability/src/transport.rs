//! Connector and transport seams for capability servers.

use crate::error::TransportError;
use async_trait::async_trait;
use herald_rs_protocol::ActionDescriptor;
use serde_json::{Map, Value};
use std::fmt;

/// Named address of a capability server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityEndpoint {
    /// Logical name, e.g. `storage` or `notification`.
    pub name: String,
    /// Server address.
    pub address: String,
}

impl CapabilityEndpoint {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for CapabilityEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Opens transports to capability servers.
#[async_trait]
pub trait CapabilityConnector: Send + Sync {
    /// Establish a live connection, including any protocol handshake.
    async fn connect(
        &self,
        endpoint: &CapabilityEndpoint,
    ) -> Result<Box<dyn CapabilityTransport>, TransportError>;
}

/// A live connection to one capability server.
#[async_trait]
pub trait CapabilityTransport: Send + Sync {
    /// Fetch the server's action catalog.
    async fn list_actions(&self) -> Result<Vec<ActionDescriptor>, TransportError>;

    /// Invoke a named action with named arguments.
    async fn call_action(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, TransportError>;

    /// Release the connection. Must tolerate repeated calls.
    async fn close(&self) -> Result<(), TransportError>;
}
