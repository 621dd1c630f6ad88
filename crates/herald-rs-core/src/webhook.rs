//! Delegation to a workflow-engine webhook.

use crate::error::OrchestrationError;
use herald_rs_protocol::{FailureKind, OrchestrationResult, TaskRequest};
use log::{debug, info};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;

const BODY_PREFIX_CHARS: usize = 200;

/// Posts the task request to a single webhook and reads its acknowledgment.
#[derive(Debug, Clone)]
pub struct WebhookDelegate {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookDelegate {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one POST bounded by the call timeout, covering the response body.
    pub async fn deliver(
        &self,
        request: &TaskRequest,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let body = json!({
            "report_name": request.report_name,
            "payload": request.payload,
            "email_to": request.email_to,
        });
        debug!("posting task to webhook (url={})", self.url);
        let exchange = async {
            let response = self
                .client
                .post(&self.url)
                .json(&body)
                .send()
                .await
                .map_err(|err| self.send_error(&err))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|err| self.body_error(status, &err))?;
            Ok::<_, OrchestrationError>((status, text))
        };
        let (status, text) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                OrchestrationError::new(
                    FailureKind::Timeout,
                    format!(
                        "webhook at {} did not answer within {}ms",
                        self.url,
                        self.timeout.as_millis()
                    ),
                )
            })??;
        info!(
            "webhook answered (url={}, status={})",
            self.url,
            status.as_u16()
        );

        if !status.is_success() {
            return Err(OrchestrationError::new(
                FailureKind::Upstream,
                format!(
                    "webhook at {} returned status {}: {}",
                    self.url,
                    status.as_u16(),
                    body_prefix(&text)
                ),
            ));
        }
        let data: Value = serde_json::from_str(&text).map_err(|err| {
            OrchestrationError::protocol(format!(
                "webhook at {} returned a non-JSON body ({err}): {}",
                self.url,
                body_prefix(&text)
            ))
        })?;
        Ok(OrchestrationResult::succeeded(format!(
            "Report stored and notification sent. Webhook response: {data}"
        ))
        .with_data(data))
    }

    /// The request did not produce a response.
    fn send_error(&self, err: &reqwest::Error) -> OrchestrationError {
        if err.is_timeout() {
            OrchestrationError::new(
                FailureKind::Timeout,
                format!("webhook at {} timed out: {err}", self.url),
            )
        } else if err.is_decode() {
            OrchestrationError::protocol(format!("webhook at {} failed: {err}", self.url))
        } else {
            OrchestrationError::new(
                FailureKind::Connectivity,
                format!("could not reach webhook at {}: {err}", self.url),
            )
        }
    }

    /// The webhook answered but its body could not be read.
    fn body_error(&self, status: StatusCode, err: &reqwest::Error) -> OrchestrationError {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Protocol
        };
        OrchestrationError::new(
            kind,
            format!(
                "webhook at {} answered with status {} but its body could not be read: {err}",
                self.url,
                status.as_u16()
            ),
        )
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

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(BODY_PREFIX_CHARS + 50);
        let prefix = body_prefix(&body);
        assert_eq!(prefix.len(), BODY_PREFIX_CHARS + 3);
        assert!(prefix.ends_with("..."));
        assert_eq!(body_prefix("  short  "), "short");
    }
}
