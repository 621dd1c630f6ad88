//! Router integration tests with a scripted oracle, fake capability servers
//! and a mock webhook.

use herald_rs_capability::{ConnectPolicy, SessionManager};
use herald_rs_config::{AgentConfig, GatewayConfig, RetryConfig};
use herald_rs_core::{Orchestrator, ToolSelector};
use herald_rs_protocol::{BackendMode, FailureKind, OrchestrationResult, ToolChoice};
use herald_rs_test_utils::{
    FakeConnector, FakeServer, MockWebhook, ScriptedSelector, sample_request, unused_address,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};

const STORAGE: &str = "http://storage.test/mcp";
const NOTIFY: &str = "http://notify.test/mcp";

fn dual_config(tool_choice: ToolChoice) -> GatewayConfig {
    GatewayConfig::builder()
        .storage_url(STORAGE)
        .notification_url(NOTIFY)
        .call_timeout_ms(200)
        .retry(RetryConfig {
            connect_attempts: 3,
            backoff_ms: 1,
        })
        .agent(AgentConfig {
            tool_choice,
            ..AgentConfig::default()
        })
        .build()
}

fn webhook_config(url: &str, call_timeout_ms: u64) -> GatewayConfig {
    GatewayConfig::builder()
        .webhook_url(url)
        .storage_url(STORAGE)
        .notification_url(NOTIFY)
        .call_timeout_ms(call_timeout_ms)
        .build()
}

fn orchestrator<S>(config: GatewayConfig, connector: &FakeConnector, selector: S) -> Orchestrator
where
    S: ToolSelector + 'static,
{
    let config = Arc::new(config);
    let sessions = SessionManager::new(
        Arc::new(connector.clone()),
        ConnectPolicy::from_config(&config),
    );
    Orchestrator::new(config, sessions, Arc::new(selector))
}

fn both_servers() -> FakeConnector {
    FakeConnector::new()
        .with_server(STORAGE, FakeServer::storage(7))
        .with_server(NOTIFY, FakeServer::notification())
}

/// Store the report, then email a confirmation that references the stored id.
fn store_then_notify() -> ScriptedSelector {
    ScriptedSelector::new()
        .invoke(
            "insert_report",
            json!({ "report_name": "Q1 Summary", "payload": { "sales": 100 } }),
        )
        .invoke_with("send_email", |results| {
            json!({
                "to": "user@example.com",
                "subject": "Report: Q1 Summary",
                "text": format!("Stored with id {}", results[0]["id"]),
            })
        })
        .finish_with(|results| format!("Report stored with id {} and email sent.", results[0]["id"]))
}

fn assert_failed(result: &OrchestrationResult, kind: FailureKind) {
    assert!(!result.success, "expected failure, got {result:?}");
    assert!(result.is_well_formed());
    assert_eq!(result.kind, Some(kind), "detail: {:?}", result.detail);
}

/// Webhook returns 200 with an id: success, outcome carries the id.
#[tokio::test]
async fn webhook_success_reports_acknowledgment() {
    let webhook = MockWebhook::json(200, json!({ "id": 1 })).await;
    let connector = both_servers();
    let router = orchestrator(
        webhook_config(&webhook.url(), 1_000),
        &connector,
        store_then_notify(),
    );

    let result = router.submit(sample_request()).await;
    assert!(result.success);
    assert!(result.is_well_formed());
    assert!(result.message().contains('1'));
    assert_eq!(result.data, Some(json!({ "id": 1 })));
    assert_eq!(webhook.hits(), 1);
    assert_eq!(
        webhook.received(),
        vec![json!({
            "report_name": "Q1 Summary",
            "payload": { "sales": 100 },
            "email_to": "user@example.com"
        })]
    );
}

/// Webhook returns 500: upstream failure naming the status.
#[tokio::test]
async fn webhook_error_status_is_upstream_failure() {
    let webhook = MockWebhook::json(500, json!({ "error": "workflow crashed" })).await;
    let connector = both_servers();
    let router = orchestrator(
        webhook_config(&webhook.url(), 1_000),
        &connector,
        store_then_notify(),
    );

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Upstream);
    let detail = result.message();
    assert!(detail.contains("500"), "{detail}");
    assert!(detail.contains("workflow crashed"), "{detail}");
    assert!(detail.contains(&webhook.url()), "{detail}");
}

#[tokio::test]
async fn webhook_non_json_body_is_protocol_failure() {
    let webhook = MockWebhook::text(200, "Workflow was started").await;
    let connector = both_servers();
    let router = orchestrator(
        webhook_config(&webhook.url(), 1_000),
        &connector,
        store_then_notify(),
    );

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Protocol);
}

/// The webhook was reached, so a body cut off mid-stream is not a connectivity failure.
#[tokio::test]
async fn webhook_body_aborted_after_status_is_protocol_failure() {
    let webhook =
        MockWebhook::broken_body(200, json!({ "id": 1, "note": "stored and notified" })).await;
    let connector = both_servers();
    let router = orchestrator(
        webhook_config(&webhook.url(), 1_000),
        &connector,
        store_then_notify(),
    );

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Protocol);
    let detail = result.message();
    assert!(!detail.contains("could not reach"), "{detail}");
    assert_eq!(webhook.hits(), 1);
}

#[tokio::test]
async fn slow_webhook_times_out_near_the_deadline() {
    let webhook = MockWebhook::delayed(200, json!({ "id": 1 }), Duration::from_secs(3)).await;
    let connector = both_servers();
    let router = orchestrator(
        webhook_config(&webhook.url(), 100),
        &connector,
        store_then_notify(),
    );

    let started = Instant::now();
    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Timeout);
    assert!(result.message().contains("timeout"));
    assert!(started.elapsed() < Duration::from_millis(1_500));
}

#[tokio::test]
async fn unreachable_webhook_is_connectivity_failure() {
    let address = format!("{}/webhook", unused_address());
    let connector = both_servers();
    let router = orchestrator(webhook_config(&address, 1_000), &connector, store_then_notify());

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Connectivity);
    assert!(result.message().contains(&address));
}

/// While a webhook is configured no capability session is ever opened.
#[tokio::test]
async fn webhook_always_wins_over_capability_servers() {
    let webhook = MockWebhook::json(500, json!({})).await;
    let connector = both_servers();
    let selector = store_then_notify();
    let router = orchestrator(
        webhook_config(&webhook.url(), 1_000),
        &connector,
        selector.clone(),
    );
    assert_eq!(router.backend_mode(), BackendMode::Webhook);

    for _ in 0..3 {
        router.submit(sample_request()).await;
    }
    assert_eq!(webhook.hits(), 3);
    assert_eq!(connector.connect_attempts(), 0);
    assert_eq!(selector.runs(), 0);
}

/// Stores a record (id 7), notifies with the id, closes both sessions.
#[tokio::test]
async fn dual_session_stores_then_notifies() {
    let connector = both_servers();
    let selector = store_then_notify();
    let router = orchestrator(dual_config(ToolChoice::Required), &connector, selector.clone());
    assert_eq!(router.backend_mode(), BackendMode::DualSession);

    let result = router.submit(sample_request()).await;
    assert!(result.success, "{result:?}");
    assert!(result.message().contains('7'));
    assert_eq!(connector.call_names(), vec!["insert_report", "send_email"]);
    let email = &connector.calls()[1];
    assert_eq!(email.arguments["text"], json!("Stored with id 7"));
    assert_eq!(connector.sessions_opened(), 2);
    assert_eq!(connector.closes(), 2);

    let invocations = result
        .data
        .as_ref()
        .and_then(|data| data.get("invocations"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[0]["server"], json!("storage"));
    assert_eq!(invocations[1]["server"], json!("notification"));

    let seen = selector.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].task.contains("Q1 Summary"));
    assert!(seen[0].task.contains("user@example.com"));
    assert_eq!(
        seen[0].actions,
        vec!["insert_report", "list_reports", "send_email"]
    );
    assert_eq!(seen[0].tool_choice, ToolChoice::Required);
}

/// Unreachable storage: connectivity failure after the retry budget, and the
/// notification session that did open is closed.
#[tokio::test]
async fn unreachable_storage_closes_the_other_session() {
    let connector = FakeConnector::new().with_server(NOTIFY, FakeServer::notification());
    let selector = store_then_notify();
    let router = orchestrator(dual_config(ToolChoice::Required), &connector, selector.clone());

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Connectivity);
    assert!(result.message().contains(STORAGE));
    assert!(result.message().contains("3 attempt(s)"));
    assert_eq!(connector.connect_attempts_to(STORAGE), 3);
    assert_eq!(connector.sessions_opened(), connector.closes());
    assert_eq!(selector.runs(), 0);
}

/// Same scenario over the MCP connector: a refused port is retried, not
/// mistaken for a malformed handshake.
#[tokio::test]
async fn unreachable_mcp_storage_is_a_connectivity_failure() {
    let config = GatewayConfig::builder()
        .storage_url(format!("{}/mcp", unused_address()))
        .notification_url(format!("{}/mcp", unused_address()))
        .call_timeout_ms(5_000)
        .retry(RetryConfig {
            connect_attempts: 2,
            backoff_ms: 1,
        })
        .build();
    let selector = store_then_notify();
    let router = Orchestrator::with_mcp(Arc::new(config), Arc::new(selector.clone()));

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Connectivity);
    assert!(result.message().contains("2 attempt(s)"), "{}", result.message());
    assert_eq!(selector.runs(), 0);
}

#[tokio::test]
async fn sessions_close_when_the_loop_fails_midway() {
    let connector = both_servers();
    let selector = ScriptedSelector::new()
        .invoke(
            "insert_report",
            json!({ "report_name": "Q1 Summary", "payload": { "sales": 100 } }),
        )
        .fail("model endpoint returned 503");
    let router = orchestrator(dual_config(ToolChoice::Required), &connector, selector);

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Upstream);
    assert!(result.message().contains("503"));
    assert_eq!(connector.sessions_opened(), 2);
    assert_eq!(connector.closes(), 2);
}

#[tokio::test]
async fn remote_action_error_aborts_the_run() {
    let connector = FakeConnector::new()
        .with_server(STORAGE, FakeServer::storage(7))
        .with_server(
            NOTIFY,
            FakeServer::notification().failing_action("send_email", "mailbox unavailable"),
        );
    let router = orchestrator(dual_config(ToolChoice::Required), &connector, store_then_notify());

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Upstream);
    assert!(result.message().contains("mailbox unavailable"));
    assert!(result.message().contains("send_email"));
    assert_eq!(connector.closes(), 2);
}

/// An invocation past the call timeout fails within a bounded margin and
/// still closes both sessions.
#[tokio::test]
async fn slow_invocation_is_contained() {
    let connector = FakeConnector::new()
        .with_server(STORAGE, FakeServer::storage(7))
        .with_server(
            NOTIFY,
            FakeServer::notification().with_call_delay(Duration::from_secs(5)),
        );
    let router = orchestrator(dual_config(ToolChoice::Required), &connector, store_then_notify());

    let started = Instant::now();
    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Timeout);
    assert!(result.message().contains("timeout"));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(connector.closes(), 2);
}

#[tokio::test]
async fn panicking_loop_becomes_a_failed_result() {
    let connector = both_servers();
    let selector = ScriptedSelector::new()
        .invoke(
            "insert_report",
            json!({ "report_name": "Q1 Summary", "payload": { "sales": 100 } }),
        )
        .panic("planner bug");
    let router = orchestrator(dual_config(ToolChoice::Required), &connector, selector);

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Protocol);
    assert!(result.message().contains("panicked"));
    assert_eq!(connector.sessions_opened(), 2);
    assert_eq!(connector.closes(), 2);
}

#[tokio::test]
async fn required_tool_use_rejects_answers_without_invocations() {
    let connector = both_servers();
    let router = orchestrator(
        dual_config(ToolChoice::Required),
        &connector,
        ScriptedSelector::new().finish("All done."),
    );

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Protocol);
    assert!(result.message().contains("tool use is required"));
    assert_eq!(connector.closes(), 2);
}

#[tokio::test]
async fn optional_tool_use_accepts_a_direct_answer() {
    let connector = both_servers();
    let router = orchestrator(
        dual_config(ToolChoice::Auto),
        &connector,
        ScriptedSelector::new().finish("Nothing to do."),
    );

    let result = router.submit(sample_request()).await;
    assert!(result.success);
    assert_eq!(result.outcome.as_deref(), Some("Nothing to do."));
    assert!(connector.calls().is_empty());
}

#[tokio::test]
async fn loop_that_gives_up_is_a_failure() {
    let connector = both_servers();
    let router = orchestrator(
        dual_config(ToolChoice::Required),
        &connector,
        ScriptedSelector::new().give_up("no suitable action"),
    );

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Upstream);
    assert!(result.message().contains("no suitable action"));
}

#[tokio::test]
async fn unknown_action_is_a_protocol_failure() {
    let connector = both_servers();
    let router = orchestrator(
        dual_config(ToolChoice::Required),
        &connector,
        ScriptedSelector::new().invoke("drop_reports", json!({})),
    );

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Protocol);
    assert!(result.message().contains("drop_reports"));
    assert!(connector.calls().is_empty());
    assert_eq!(connector.closes(), 2);
}

#[tokio::test]
async fn arguments_outside_the_schema_are_not_coerced() {
    let connector = both_servers();
    let router = orchestrator(
        dual_config(ToolChoice::Required),
        &connector,
        ScriptedSelector::new().invoke(
            "insert_report",
            json!({ "report_name": "Q1 Summary", "payload": "{\"sales\": 100}" }),
        ),
    );

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Protocol);
    assert!(result.message().contains("payload"));
    assert!(connector.calls().is_empty());
}

#[tokio::test]
async fn duplicate_action_names_across_servers_are_rejected() {
    let connector = FakeConnector::new()
        .with_server(STORAGE, FakeServer::storage(1))
        .with_server(NOTIFY, FakeServer::storage(100));
    let router = orchestrator(dual_config(ToolChoice::Required), &connector, store_then_notify());

    let result = router.submit(sample_request()).await;
    assert_failed(&result, FailureKind::Protocol);
    assert!(result.message().contains("insert_report"));
    assert_eq!(connector.closes(), 2);
}

#[tokio::test]
async fn malformed_body_is_an_input_failure() {
    let connector = both_servers();
    let router = orchestrator(dual_config(ToolChoice::Required), &connector, store_then_notify());

    let result = router.submit_json(b"{\"report_name\": \"Q1\", ").await;
    assert_failed(&result, FailureKind::Input);

    let result = router
        .submit_json(br#"{"report_name": "Q1", "payload": [1, 2], "email_to": "a@b.c"}"#)
        .await;
    assert_failed(&result, FailureKind::Input);
    assert!(result.message().contains("payload"));

    let result = router
        .submit_json(br#"{"report_name": "Q1", "payload": {}, "email_to": "  "}"#)
        .await;
    assert_failed(&result, FailureKind::Input);
    assert!(result.message().contains("email_to"));
    assert_eq!(connector.connect_attempts(), 0);
}

#[tokio::test]
async fn concurrent_tasks_use_independent_sessions() {
    let connector = both_servers();
    let router = orchestrator(dual_config(ToolChoice::Required), &connector, store_then_notify());

    let (first, second) = tokio::join!(
        router.submit(sample_request()),
        router.submit(sample_request())
    );
    assert!(first.success && second.success);
    let mut outcomes = vec![first.message().to_string(), second.message().to_string()];
    outcomes.sort();
    assert!(outcomes[0].contains('7'));
    assert!(outcomes[1].contains('8'));
    assert_eq!(connector.sessions_opened(), 4);
    assert_eq!(connector.closes(), 4);
}

#[tokio::test]
async fn health_reports_backend_and_tool_choice() {
    let connector = FakeConnector::new();
    let router = orchestrator(dual_config(ToolChoice::Auto), &connector, store_then_notify());
    let health = router.health();
    assert_eq!(health.status, "ok");
    assert_eq!(health.agent, "herald");
    assert_eq!(health.backend, BackendMode::DualSession);
    assert_eq!(health.tool_choice, ToolChoice::Auto);

    let router = orchestrator(
        webhook_config("http://n8n.test/webhook/report", 1_000),
        &connector,
        store_then_notify(),
    );
    assert_eq!(router.health().backend, BackendMode::Webhook);
}
