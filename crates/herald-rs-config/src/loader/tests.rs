//! Tests for config loading and the environment overlay.

use super::*;
use crate::PlannerKind;
use herald_rs_protocol::{BackendMode, ToolChoice};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

/// Verify that a minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = GatewayConfig::load_from_str("{}").expect("config");
    assert_eq!(config.routing.storage_url, "http://localhost:8001/mcp");
    assert_eq!(config.routing.notification_url, "http://localhost:8002/mcp");
    assert_eq!(config.timeouts.call_timeout_ms, 15_000);
    assert_eq!(config.retry.connect_attempts, 3);
    assert_eq!(config.agent.tool_choice, ToolChoice::Required);
    assert_eq!(config.backend_mode(), BackendMode::DualSession);
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = GatewayConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(format!("{err}").contains("unknown field"));
}

#[test]
fn parses_json5_with_comments() {
    let json5 = r#"{
        // delegate everything to the workflow engine
        routing: { webhook_url: "http://n8n:5678/webhook/report" },
        retry: { connect_attempts: 5, },
        agent: { planner: "deterministic", tool_choice: "auto" },
    }"#;
    let config = GatewayConfig::load_from_str(json5).expect("config");
    assert_eq!(config.backend_mode(), BackendMode::Webhook);
    assert_eq!(config.retry.connect_attempts, 5);
    assert_eq!(config.agent.planner, PlannerKind::Deterministic);
    assert_eq!(config.agent.tool_choice, ToolChoice::Auto);
}

#[test]
fn blank_webhook_keeps_dual_session_mode() {
    let config = GatewayConfig::load_from_str(r#"{ routing: { webhook_url: "   " } }"#)
        .expect("config");
    assert_eq!(config.routing.webhook(), None);
    assert_eq!(config.backend_mode(), BackendMode::DualSession);
}

#[test]
fn rejects_zero_attempts() {
    let err = GatewayConfig::load_from_str("{ retry: { connect_attempts: 0 } }").unwrap_err();
    assert!(format!("{err}").contains("retry.connect_attempts"));
}

#[test]
fn rejects_zero_call_timeout() {
    let err = GatewayConfig::load_from_str("{ timeouts: { call_timeout_ms: 0 } }").unwrap_err();
    assert!(format!("{err}").contains("timeouts.call_timeout_ms"));
}

#[test]
fn env_overlay_overrides_file_values() {
    let config = GatewayConfig::load_from_str("{}")
        .expect("config")
        .with_env(env(&[
            (env_keys::WEBHOOK_URL, "http://hook.local/run"),
            (env_keys::CALL_TIMEOUT_MS, "250"),
            (env_keys::CONNECT_ATTEMPTS, "2"),
            (env_keys::TOOL_CHOICE, "AUTO"),
            (env_keys::PLANNER, "deterministic"),
        ]))
        .expect("overlay");
    assert_eq!(config.routing.webhook(), Some("http://hook.local/run"));
    assert_eq!(config.timeouts.call_timeout_ms, 250);
    assert_eq!(config.retry.connect_attempts, 2);
    assert_eq!(config.agent.tool_choice, ToolChoice::Auto);
    assert_eq!(config.agent.planner, PlannerKind::Deterministic);
}

#[test]
fn env_blank_webhook_clears_file_webhook() {
    let config = GatewayConfig::builder()
        .webhook_url("http://hook.local/run")
        .build()
        .with_env(env(&[(env_keys::WEBHOOK_URL, "")]))
        .expect("overlay");
    assert_eq!(config.routing.webhook_url, None);
    assert_eq!(config.backend_mode(), BackendMode::DualSession);
}

#[test]
fn env_rejects_non_numeric_timeout() {
    let err = GatewayConfig::default()
        .with_env(env(&[(env_keys::CALL_TIMEOUT_MS, "soon")]))
        .unwrap_err();
    assert!(format!("{err}").contains(env_keys::CALL_TIMEOUT_MS));
}

#[test]
fn env_rejects_unknown_tool_choice() {
    let err = GatewayConfig::default()
        .with_env(env(&[(env_keys::TOOL_CHOICE, "sometimes")]))
        .unwrap_err();
    assert!(format!("{err}").contains(env_keys::TOOL_CHOICE));
}

#[test]
fn load_from_path_reads_file() {
    let temp = TempDir::new().expect("tmp");
    let path = temp.path().join("herald.json5");
    std::fs::write(
        &path,
        r#"{ routing: { storage_url: "http://db:8001/mcp" }, server: { bind: "127.0.0.1:9000" } }"#,
    )
    .expect("write");
    let config = GatewayConfig::load_from_path(&path).expect("config");
    assert_eq!(config.routing.storage_url, "http://db:8001/mcp");
    assert_eq!(config.server.bind, "127.0.0.1:9000");
}

#[test]
fn load_from_missing_path_reports_read_failure() {
    let temp = TempDir::new().expect("tmp");
    let err = GatewayConfig::load_from_path(temp.path().join("missing.json5")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}
