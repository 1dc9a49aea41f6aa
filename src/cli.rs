// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `rollout`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rollout",
    version,
    about = "Run a declarative deployment task list against remote hosts.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task list file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Rollout.toml")]
    pub tasklist: String,

    /// Parse + validate, print the staged plan, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Remote user for tasks that don't set `remote_user` themselves.
    #[arg(long, value_name = "NAME", default_value = "deploy")]
    pub remote_user: String,

    /// Scheduler tick in milliseconds.
    ///
    /// The default of one second is deliberate: individual remote operations
    /// take seconds, so sub-second admission latency buys nothing.
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub tick_ms: u64,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ROLLOUT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
