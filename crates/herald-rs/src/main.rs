use anyhow::Context;
use clap::Parser;
use herald_rs::cli::{Cli, Command};
use herald_rs::client::GatewayClient;
use herald_rs::config::{GatewayConfig, TimeoutConfig};
use herald_rs::core::Orchestrator;
use herald_rs::server::GatewayServer;
use herald_rs::{OPENAI_API_KEY, build_selector, init_logging, load_config};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;

/// Entry point for the Herald gateway and its client commands.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config, bind } => serve(config, bind).await,
        Command::Submit {
            name,
            payload,
            to,
            gateway,
        } => {
            let client = GatewayClient::new(gateway, TimeoutConfig::default().client_timeout());
            debug!("submitting task (gateway={})", client.base_url());
            let message = client.store_report_and_notify(&name, &payload, &to).await;
            println!("{message}");
            Ok(())
        }
        Command::Health { gateway } => {
            let client = GatewayClient::new(gateway, TimeoutConfig::default().client_timeout());
            let report = client
                .health()
                .await
                .with_context(|| format!("health check failed for {}", client.base_url()))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to encode health report")?
            );
            Ok(())
        }
    }
}

async fn serve(config_path: Option<PathBuf>, bind: Option<String>) -> anyhow::Result<()> {
    info!(
        "starting gateway (config_set={}, bind_set={})",
        config_path.is_some(),
        bind.is_some()
    );
    let config: GatewayConfig = load_config(config_path.as_deref(), bind.as_deref(), |key| {
        std::env::var(key).ok()
    })?;
    let selector = build_selector(&config, std::env::var(OPENAI_API_KEY).ok())?;

    let config = Arc::new(config);
    let orchestrator = Arc::new(Orchestrator::with_mcp(config.clone(), selector));
    let server = GatewayServer::bind(&config.server.bind, orchestrator)
        .await
        .context("failed to start gateway server")?;
    info!("gateway listening on {}", server.url());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down gateway");
    server.stop().await.context("gateway server failed")?;
    Ok(())
}
