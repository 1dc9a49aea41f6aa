// src/logging.rs

//! Logging setup: `tracing` with a fmt subscriber.
//!
//! The level comes from the `--log-level` flag when given, otherwise from
//! the `ROLLOUT_LOG` environment variable, otherwise `info`.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = resolve_level(cli_level, std::env::var("ROLLOUT_LOG").ok());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

fn resolve_level(cli_level: Option<LogLevel>, env_value: Option<String>) -> Level {
    cli_level
        .map(Level::from)
        .or_else(|| env_value.and_then(|s| s.trim().parse().ok()))
        .unwrap_or(Level::INFO)
}
