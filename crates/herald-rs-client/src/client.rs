use herald_rs_protocol::HealthReport;
use log::{debug, warn};
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8000";

const BODY_PREFIX_CHARS: usize = 200;

/// Errors from the structured client calls.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach gateway at {url}: {message}")]
    Connect { url: String, message: String },
    #[error("timeout calling gateway: {0}")]
    Timeout(String),
    #[error("gateway returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

/// HTTP client for the gateway's submit and health endpoints.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit one task. Never fails: errors come back as descriptive text,
    /// including a 2xx answer that is not a successful orchestration result.
    pub async fn store_report_and_notify(
        &self,
        report_name: &str,
        payload_json: &str,
        email_to: &str,
    ) -> String {
        let payload: Value = match serde_json::from_str(payload_json) {
            Ok(payload) => payload,
            Err(err) => return format!("Invalid payload_json: {err}"),
        };
        let body = json!({
            "report_name": report_name,
            "payload": payload,
            "email_to": email_to,
        });
        let url = format!("{}/store_report_and_notify", self.base_url);
        debug!("submitting task to gateway (url={url})");

        let response = match self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return self.describe_transport_error(&err),
        };
        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => return self.describe_transport_error(&err),
        };

        if status.as_u16() >= 400 {
            warn!("gateway rejected task (status={})", status.as_u16());
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|value| value.get("detail").and_then(Value::as_str).map(String::from))
                .unwrap_or(text);
            return format!("Server error ({}): {detail}", status.as_u16());
        }
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            warn!("gateway answered with a non-JSON body");
            return format!("Unexpected gateway response: {}", body_prefix(&text));
        };
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            let detail = value
                .get("detail")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| body_prefix(&text));
            return format!("Gateway reported failure: {detail}");
        }
        match value.get("outcome").and_then(Value::as_str) {
            Some(outcome) => outcome.to_string(),
            None => format!("Unexpected gateway response: {}", body_prefix(&text)),
        }
    }

    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| self.client_error(&err))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| self.client_error(&err))?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|err| ClientError::Decode(err.to_string()))
    }

    fn describe_transport_error(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("Timeout calling gateway: {err}")
        } else if err.is_connect() {
            format!(
                "Connection error: could not reach gateway at {}. Is it running? Detail: {err}",
                self.base_url
            )
        } else {
            format!("Request error calling gateway at {}: {err}", self.base_url)
        }
    }

    fn client_error(&self, err: &reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_connect() {
            ClientError::Connect {
                url: self.base_url.clone(),
                message: err.to_string(),
            }
        } else {
            ClientError::Decode(err.to_string())
        }
    }
}

fn body_prefix(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_PREFIX_CHARS {
        return trimmed.to_string();
    }
    let prefix: String = trimmed.chars().take(BODY_PREFIX_CHARS).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn invalid_payload_is_reported_before_any_request() {
        let client = GatewayClient::new("http://127.0.0.1:9", Duration::from_secs(1));
        let message = client
            .store_report_and_notify("Q1", "{\"sales\": ", "a@b.c")
            .await;
        assert!(message.starts_with("Invalid payload_json: "), "{message}");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = GatewayClient::new("http://localhost:8000/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
