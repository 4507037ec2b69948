//! patchbench command line
//!
//! Serves a benchmark task corpus over HTTP and evaluates candidate patches
//! by driving an external evaluation harness.
//!
//! # Installation
//!
//! ```bash
//! cargo install --path crates/patchbench-cli
//! ```
//!
//! # Commands
//!
//! - `patchbench serve` starts the HTTP API (`RUST_LOG=debug` for verbose logs)
//! - `patchbench evaluate <task_id> <patch>` runs one evaluation and prints the outcome
//! - `patchbench task <task_id>...` prints catalog records
//! - `patchbench config show` prints the effective configuration

mod api_types;
mod args;
mod commands;
mod console;
mod http_server;
mod logging;
mod router;

use clap::Parser;

pub use args::{Cli, Commands, ConfigAction};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    router::route(cli).await
}
