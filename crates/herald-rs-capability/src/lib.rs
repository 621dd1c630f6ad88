//! Capability sessions: connections to remote servers that expose a catalog
//! of named, schema-typed actions.
//!
//! A [`SessionManager`] opens one [`CapabilitySession`] per server and per
//! task, retrying the connection within a bounded budget, fetching the action
//! catalog once, and handing the session back to the caller, who must close
//! it. The wire protocol sits behind the [`CapabilityConnector`] and
//! [`CapabilityTransport`] seams; [`McpConnector`] speaks MCP over
//! streamable HTTP.

mod error;
mod manager;
mod mcp;
mod session;
mod transport;

pub use error::{CapabilityError, TransportError};
pub use manager::{ConnectPolicy, SessionManager};
pub use mcp::McpConnector;
pub use session::{CapabilitySession, SessionState};
pub use transport::{CapabilityConnector, CapabilityEndpoint, CapabilityTransport};
