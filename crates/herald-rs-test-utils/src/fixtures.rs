use herald_rs_protocol::{ActionDescriptor, SideEffect, TaskRequest};
use serde_json::json;

/// Catalog of a storage server: `insert_report` and a read-only `list_reports`.
pub fn storage_actions() -> Vec<ActionDescriptor> {
    vec![
        ActionDescriptor::new(
            "insert_report",
            json!({
                "type": "object",
                "properties": {
                    "report_name": { "type": "string" },
                    "payload": { "type": "object" }
                },
                "required": ["report_name", "payload"]
            }),
        )
        .with_description("Insert a report into the database. Returns the new row id and report_name."),
        ActionDescriptor::new(
            "list_reports",
            json!({
                "type": "object",
                "properties": { "limit": { "type": "integer", "default": 10 } }
            }),
        )
        .with_description("List recent reports from the database.")
        .with_side_effect(SideEffect::Read),
    ]
}

/// Catalog of a notification server: `send_email`.
pub fn notification_actions() -> Vec<ActionDescriptor> {
    vec![
        ActionDescriptor::new(
            "send_email",
            json!({
                "type": "object",
                "properties": {
                    "to": { "type": "string" },
                    "subject": { "type": "string" },
                    "text": { "type": "string" }
                },
                "required": ["to", "subject", "text"]
            }),
        )
        .with_description("Send an email."),
    ]
}

pub fn sample_request() -> TaskRequest {
    let payload = json!({ "sales": 100 }).as_object().cloned().unwrap_or_default();
    TaskRequest::new("Q1 Summary", payload, "user@example.com")
}

/// An HTTP address on a local port that nothing listens on.
pub fn unused_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    let port = listener.local_addr().expect("free port address").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
