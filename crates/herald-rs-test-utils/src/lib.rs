//! Test helpers shared across Herald crates.

pub mod capability;
pub mod fixtures;
pub mod llm;
pub mod selector;
pub mod webhook;

pub use capability::{FakeConnector, FakeServer, RecordedCall};
pub use fixtures::{notification_actions, sample_request, storage_actions, unused_address};
pub use llm::{FixedChatResponse, ScriptedLLM, tool_call};
pub use selector::{ScriptStep, ScriptedSelector, SeenRequest};
pub use webhook::MockWebhook;
