// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `semisync`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "semisync",
    version,
    about = "Run the revenue/expenses/profit demo on the dependency-aware scheduler.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the scheduler config file (TOML).
    ///
    /// If omitted, `Semisync.toml` is used when it exists, otherwise the
    /// built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SEMISYNC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Register the workload and print the task graph, but run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Upper bound of the simulated API latency, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub max_delay_ms: u64,

    /// Seed for the simulated figures and latencies.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,
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

impl LogLevel {
    /// Lowercase name, usable as an `EnvFilter` directive.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
