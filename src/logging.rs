// src/logging.rs

//! Global `tracing` subscriber for the `semisync` binary.
//!
//! `--log-level` wins over `SEMISYNC_LOG`, which may hold any `EnvFilter`
//! directive (`debug`, `semisync::engine=trace,info`). Without either the
//! filter is `info`. Output goes to stderr so stdout stays free for the
//! demo's figures.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "SEMISYNC_LOG";

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(cli_level, env.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid {LOG_ENV} filter '{directive}'"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// The filter directive the subscriber is built from.
pub fn filter_directive(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level.as_str().to_string();
    }
    match env.map(str::trim) {
        Some(directive) if !directive.is_empty() => directive.to_string(),
        _ => LogLevel::Info.as_str().to_string(),
    }
}
