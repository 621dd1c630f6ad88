//! Environment variables overlaid on top of the file configuration.

pub const WEBHOOK_URL: &str = "HERALD_WEBHOOK_URL";
pub const STORAGE_URL: &str = "HERALD_STORAGE_URL";
pub const NOTIFICATION_URL: &str = "HERALD_NOTIFICATION_URL";
pub const CALL_TIMEOUT_MS: &str = "HERALD_CALL_TIMEOUT_MS";
pub const CONNECT_ATTEMPTS: &str = "HERALD_CONNECT_ATTEMPTS";
pub const PLANNER: &str = "HERALD_PLANNER";
pub const MODEL: &str = "HERALD_MODEL";
pub const TOOL_CHOICE: &str = "HERALD_TOOL_CHOICE";
pub const BIND: &str = "HERALD_BIND";
