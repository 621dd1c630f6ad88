//! Instructions and task text handed to the tool-selection loop.

use herald_rs_protocol::TaskRequest;

/// Default instructions for the dual-session path.
pub const DEFAULT_INSTRUCTIONS: &str = "You orchestrate storing reports and sending notifications. \
You have actions from two servers: the storage server persists a report and returns its id, \
the notification server sends an email given a recipient, a subject and a text body. \
When asked to store a report and notify, first store the report, then send the email \
to the given recipient with the report details and the stored id. \
Only pass the arguments each action declares.";

/// Sent once when tool use is required and the model answered without calling anything.
pub const TOOL_REQUIRED_NUDGE: &str = "You must complete the task by calling the available \
actions. Do not answer before the report is stored and the notification is sent.";

/// Notification subject for a stored report.
pub fn notification_subject(request: &TaskRequest) -> String {
    format!("Report: {}", request.report_name)
}

/// Natural-language task embedding every request field verbatim.
pub fn task_description(request: &TaskRequest) -> String {
    format!(
        "Store a report with report_name={:?} and payload={}. \
         Then send an email to {:?} with subject {:?} \
         and body containing the payload (formatted as JSON).",
        request.report_name,
        request.payload_json(),
        request.email_to,
        notification_subject(request),
    )
}

/// Resolve configured instructions, falling back to [`DEFAULT_INSTRUCTIONS`].
pub fn instructions(configured: Option<&str>) -> String {
    configured
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(DEFAULT_INSTRUCTIONS)
        .to_string()
}
