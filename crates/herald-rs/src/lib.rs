//! Public SDK surface for Herald.
//!
//! This crate re-exports the gateway building blocks and hosts the command
//! line definitions and startup helpers used by the `herald` binary.

pub mod cli;
mod startup;

/// Re-export for convenience.
pub use herald_rs_capability as capability;
/// Re-export for convenience.
pub use herald_rs_client as client;
pub use herald_rs_config as config;
pub use herald_rs_core as core;
/// Re-export for convenience.
pub use herald_rs_protocol as protocol;
pub use herald_rs_server as server;

pub use startup::{OPENAI_API_KEY, build_selector, load_config};

#[inline]
/// Initialize logging with env_logger, driven by `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}
