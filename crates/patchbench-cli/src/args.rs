//! CLI argument definitions using clap
//!
//! - patchbench serve               # HTTP API
//! - patchbench evaluate <id> <p>   # One-shot evaluation
//! - patchbench task <id>...        # Catalog lookup
//! - patchbench config show         # Effective configuration

use clap::{Parser, Subcommand, ValueEnum};
use patchbench_core::config::{LogFormat, defaults};
use std::path::PathBuf;

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = defaults::CONFIG_FILE;

#[derive(Parser)]
#[command(name = "patchbench")]
#[command(about = "Serve a benchmark task corpus and evaluate candidate patches")]
#[command(
    long_about = r#"Serve a benchmark task corpus and evaluate candidate patches

USAGE:
  patchbench serve                         # Start the HTTP API
  patchbench evaluate <task_id> <patch>    # Evaluate one patch ('-' reads stdin)
  patchbench task <task_id>...             # Print catalog records
  patchbench config show                   # Print the effective configuration

Configuration is read from patchbench.toml (if present), then from
PATCHBENCH_<SECTION>__<KEY> environment variables, then from flags."#
)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (must exist when given explicitly)
    #[arg(long, short = 'c', global = true, env = "PATCHBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(long, short)]
        port: Option<u16>,

        /// Dataset export (JSON array or JSON Lines)
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Harness runs driven at once by a batch request
        #[arg(long)]
        batch_concurrency: Option<usize>,
    },

    /// Evaluate one patch against one task and print the outcome
    Evaluate {
        /// Task identifier, e.g. django__django-11099
        task_id: String,

        /// File holding the unified diff, or '-' for stdin
        patch: PathBuf,

        /// Harness time limit, e.g. 45m
        #[arg(long)]
        timeout: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print catalog records for one or more tasks
    Task {
        /// Task identifiers
        #[arg(required = true)]
        task_ids: Vec<String>,

        /// Dataset export (JSON array or JSON Lines)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Display the effective configuration
    Show {
        /// Output format
        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },

    /// Validate the configuration and print a summary
    Validate,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}
