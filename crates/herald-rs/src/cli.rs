use clap::{Parser, Subcommand};
use herald_rs_client::DEFAULT_GATEWAY_URL;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "herald",
    version,
    about = "Store a report and notify someone, through a webhook or MCP capability servers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the gateway HTTP server
    Serve {
        /// Path to a JSON5 config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Listen address, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Submit one task to a running gateway
    Submit {
        /// Report name
        #[arg(long)]
        name: String,
        /// Report payload as a JSON object string
        #[arg(long)]
        payload: String,
        /// Notification recipient
        #[arg(long)]
        to: String,
        #[arg(long, default_value = DEFAULT_GATEWAY_URL)]
        gateway: String,
    },
    /// Print the health report of a running gateway
    Health {
        #[arg(long, default_value = DEFAULT_GATEWAY_URL)]
        gateway: String,
    },
}
