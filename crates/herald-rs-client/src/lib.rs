//! Client side of the Herald gateway.
//!
//! [`GatewayClient`] calls the gateway and turns every outcome, including
//! transport failures, into a string. [`GatewayTool`] exposes it as an agent
//! tool.

mod client;
mod tool;

pub use client::{ClientError, DEFAULT_GATEWAY_URL, GatewayClient};
pub use tool::{GATEWAY_TOOL_NAME, GatewayTool};
