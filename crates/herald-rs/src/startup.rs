use anyhow::{Context, bail};
use autoagents_llm::LLMProvider;
use autoagents_llm::backends::openai::OpenAI;
use autoagents_llm::builder::LLMBuilder;
use herald_rs_config::{GatewayConfig, PlannerKind};
use herald_rs_core::{DeterministicSelector, LlmToolSelector, ToolSelector};
use herald_rs_protocol::BackendMode;
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Load the config file (or defaults), overlay the environment, apply an
/// optional bind override and validate.
pub fn load_config<F>(
    path: Option<&Path>,
    bind: Option<&str>,
    lookup: F,
) -> anyhow::Result<GatewayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => GatewayConfig::load_from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    config
        .apply_env(lookup)
        .context("invalid environment override")?;
    if let Some(bind) = bind {
        config.server.bind = bind.to_string();
    }
    config.validate().context("invalid config")?;
    Ok(config)
}

/// Build the tool-selection loop named by `agent.planner`.
///
/// The webhook path never consults the loop, so a missing API key only
/// fails startup when the gateway routes to capability servers.
pub fn build_selector(
    config: &GatewayConfig,
    api_key: Option<String>,
) -> anyhow::Result<Arc<dyn ToolSelector>> {
    match config.agent.planner {
        PlannerKind::Deterministic => Ok(Arc::new(DeterministicSelector::new())),
        PlannerKind::Llm => {
            let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) else {
                if config.backend_mode() == BackendMode::Webhook {
                    warn!(
                        "{OPENAI_API_KEY} not set; webhook routing does not need it, using deterministic planner"
                    );
                    return Ok(Arc::new(DeterministicSelector::new()));
                }
                bail!(
                    "{OPENAI_API_KEY} must be set for agent.planner = \"llm\" (or use \"deterministic\")"
                );
            };
            info!("building LLM provider (model={})", config.agent.model);
            let llm: Arc<dyn LLMProvider> = LLMBuilder::<OpenAI>::new()
                .api_key(api_key)
                .model(config.agent.model.clone())
                .build()
                .context("failed to build OpenAI LLM provider")?;
            Ok(Arc::new(LlmToolSelector::new(llm)))
        }
    }
}
