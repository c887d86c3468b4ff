//! Public surface for toolrelay.
//!
//! This crate re-exports the building blocks and provides the helpers the
//! `toolrelay` binary is assembled from.

pub mod chat;

/// Re-export for convenience.
pub use toolrelay_config as config;
pub use toolrelay_core as core;
/// Re-export for convenience.
pub use toolrelay_protocol as protocol;
pub use toolrelay_tools as tools;

use anyhow::Context;
use std::time::Duration;
use toolrelay_config::ToolsConfig;
use toolrelay_tools::{ToolRegistry, register_builtin_tools};

#[inline]
/// Initialize logging using env_logger.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}

/// Build the registry of built-in tools enabled by the config.
pub fn builtin_registry(config: &ToolsConfig) -> anyhow::Result<ToolRegistry> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("failed to create HTTP client for tools")?;
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry, config, client);
    Ok(registry)
}
