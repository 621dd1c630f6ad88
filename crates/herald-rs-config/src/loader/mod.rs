//! Config loading: JSON5 file, environment overlay, validation.

pub mod env_keys;

#[cfg(test)]
mod tests;

use crate::{ConfigError, GatewayConfig};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::str::FromStr;

impl GatewayConfig {
    /// Load a config from a JSON5 file and validate it.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    /// Load a config from JSON5 contents and validate it.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        let value: Value = json5::from_str(contents)?;
        let config: GatewayConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Overlay values from an environment lookup and re-validate.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_env(lookup)?;
        self.validate()?;
        Ok(self)
    }

    /// Overlay values from an environment lookup without validating.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(env_keys::WEBHOOK_URL) {
            let url = url.trim().to_string();
            debug!("webhook address from env (set={})", !url.is_empty());
            self.routing.webhook_url = (!url.is_empty()).then_some(url);
        }
        if let Some(url) = lookup(env_keys::STORAGE_URL) {
            self.routing.storage_url = url.trim().to_string();
        }
        if let Some(url) = lookup(env_keys::NOTIFICATION_URL) {
            self.routing.notification_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(env_keys::CALL_TIMEOUT_MS) {
            self.timeouts.call_timeout_ms = parse_number(env_keys::CALL_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(env_keys::CONNECT_ATTEMPTS) {
            self.retry.connect_attempts = parse_number(env_keys::CONNECT_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = lookup(env_keys::PLANNER) {
            self.agent.planner = parse_label(env_keys::PLANNER, &raw)?;
        }
        if let Some(model) = lookup(env_keys::MODEL) {
            self.agent.model = model.trim().to_string();
        }
        if let Some(raw) = lookup(env_keys::TOOL_CHOICE) {
            self.agent.tool_choice = parse_label(env_keys::TOOL_CHOICE, &raw)?;
        }
        if let Some(bind) = lookup(env_keys::BIND) {
            self.server.bind = bind.trim().to_string();
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routing.storage_url.trim().is_empty() {
            return Err(ConfigError::invalid(
                "routing.storage_url",
                "cannot be empty",
            ));
        }
        if self.routing.notification_url.trim().is_empty() {
            return Err(ConfigError::invalid(
                "routing.notification_url",
                "cannot be empty",
            ));
        }
        if self.timeouts.call_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "timeouts.call_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.timeouts.planner_turn_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "timeouts.planner_turn_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.timeouts.client_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "timeouts.client_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.retry.connect_attempts == 0 {
            return Err(ConfigError::invalid(
                "retry.connect_attempts",
                "must be at least 1",
            ));
        }
        if self.agent.max_turns == 0 {
            return Err(ConfigError::invalid(
                "agent.max_turns",
                "must be at least 1",
            ));
        }
        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::invalid("server.bind", "cannot be empty"));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| ConfigError::invalid(key, format!("expected a number: {err}")))
}

fn parse_label<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, ConfigError> {
    serde_json::from_value(Value::String(raw.trim().to_ascii_lowercase()))
        .map_err(|err| ConfigError::invalid(key, err.to_string()))
}
