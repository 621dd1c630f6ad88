//! End-to-end HTTP tests against a gateway bound to a random local port.

use herald_rs_capability::{ConnectPolicy, SessionManager};
use herald_rs_config::{GatewayConfig, RetryConfig};
use herald_rs_core::Orchestrator;
use herald_rs_server::GatewayServer;
use herald_rs_test_utils::{FakeConnector, FakeServer, MockWebhook, ScriptedSelector};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const STORAGE: &str = "http://storage.test/mcp";
const NOTIFY: &str = "http://notify.test/mcp";

fn selector() -> ScriptedSelector {
    ScriptedSelector::new()
        .invoke(
            "insert_report",
            json!({ "report_name": "Q1 Summary", "payload": { "sales": 100 } }),
        )
        .invoke_with("send_email", |results| {
            json!({
                "to": "user@example.com",
                "subject": "Report: Q1 Summary",
                "text": format!("id {}", results[0]["id"]),
            })
        })
        .finish_with(|results| format!("Stored report {}", results[0]["id"]))
}

async fn start(config: GatewayConfig, connector: FakeConnector) -> GatewayServer {
    let config = Arc::new(config);
    let sessions = SessionManager::new(Arc::new(connector), ConnectPolicy::from_config(&config));
    let orchestrator = Arc::new(Orchestrator::new(config, sessions, Arc::new(selector())));
    GatewayServer::bind("127.0.0.1:0", orchestrator)
        .await
        .expect("bind gateway")
}

fn dual_config() -> GatewayConfig {
    GatewayConfig::builder()
        .storage_url(STORAGE)
        .notification_url(NOTIFY)
        .call_timeout_ms(500)
        .retry(RetryConfig {
            connect_attempts: 2,
            backoff_ms: 1,
        })
        .build()
}

async fn post(server: &GatewayServer, body: &str) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/store_report_and_notify", server.url()))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("send");
    let status = response.status().as_u16();
    let value = response.json::<Value>().await.expect("json body");
    (status, value)
}

const REQUEST: &str =
    r#"{"report_name": "Q1 Summary", "payload": {"sales": 100}, "email_to": "user@example.com"}"#;

#[tokio::test]
async fn submit_returns_success_result() {
    let connector = FakeConnector::new()
        .with_server(STORAGE, FakeServer::storage(7))
        .with_server(NOTIFY, FakeServer::notification());
    let server = start(dual_config(), connector.clone()).await;

    let (status, body) = post(&server, REQUEST).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["outcome"], json!("Stored report 7"));
    assert_eq!(body["detail"], Value::Null);
    assert_eq!(connector.closes(), 2);

    server.stop().await.expect("stop");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let server = start(dual_config(), FakeConnector::new()).await;

    let (status, body) = post(&server, "{not json").await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["kind"], json!("input"));
    assert!(body["detail"].as_str().unwrap_or_default().contains("input failure"));

    server.stop().await.expect("stop");
}

#[tokio::test]
async fn unreachable_provider_is_bad_gateway() {
    let connector = FakeConnector::new().with_server(NOTIFY, FakeServer::notification());
    let server = start(dual_config(), connector.clone()).await;

    let (status, body) = post(&server, REQUEST).await;
    assert_eq!(status, 502);
    assert_eq!(body["kind"], json!("connectivity"));
    assert!(body["detail"].as_str().unwrap_or_default().contains(STORAGE));
    assert_eq!(connector.sessions_opened(), connector.closes());

    server.stop().await.expect("stop");
}

#[tokio::test]
async fn webhook_timeout_is_gateway_timeout() {
    let webhook = MockWebhook::delayed(200, json!({ "id": 1 }), Duration::from_secs(3)).await;
    let config = GatewayConfig::builder()
        .webhook_url(webhook.url())
        .call_timeout_ms(100)
        .build();
    let server = start(config, FakeConnector::new()).await;

    let (status, body) = post(&server, REQUEST).await;
    assert_eq!(status, 504);
    assert_eq!(body["kind"], json!("timeout"));

    server.stop().await.expect("stop");
}

#[tokio::test]
async fn health_reports_active_backend() {
    let server = start(dual_config(), FakeConnector::new()).await;

    let body = reqwest::get(format!("{}/health", server.url()))
        .await
        .expect("health")
        .json::<Value>()
        .await
        .expect("json");
    assert_eq!(
        body,
        json!({
            "status": "ok",
            "agent": "herald",
            "backend": "dual_session",
            "tool_choice": "required"
        })
    );

    server.stop().await.expect("stop");
}
