//! Command routing logic for CLI

use std::collections::HashMap;

use anyhow::Result;
use patchbench_core::config::{AppConfig, ConfigLoader, LogFormat};

use crate::args::{Cli, Commands, ConfigAction, DEFAULT_CONFIG_FILE};
use crate::{commands, http_server, logging};

/// Load configuration, install logging and dispatch the subcommand
pub async fn route(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    logging::init(&config.logging)?;
    tracing::debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Serve { .. } => http_server::start_http_server(config).await,
        Commands::Evaluate {
            task_id,
            patch,
            json,
            ..
        } => commands::evaluate::run(&config, &task_id, &patch, json).await,
        Commands::Task { task_ids, .. } => commands::task::show(&config, &task_ids).await,
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => commands::config::show(&config, format).await,
            ConfigAction::Validate => commands::config::validate(&config).await,
        },
    }
}

/// Defaults, then the config file, then the environment, then flags
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::new().with_required_file(path),
        None => ConfigLoader::new().with_file(DEFAULT_CONFIG_FILE),
    };
    Ok(loader.with_env().with_overrides(overrides(cli)).load()?)
}

/// Dotted-key overrides collected from command line flags
fn overrides(cli: &Cli) -> HashMap<String, String> {
    let mut map = HashMap::new();

    if let Some(level) = &cli.log_level {
        map.insert("logging.level".to_string(), level.clone());
    }
    if let Some(format) = cli.log_format {
        let format = match LogFormat::from(format) {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        };
        map.insert("logging.format".to_string(), format.to_string());
    }

    match &cli.command {
        Commands::Serve {
            host,
            port,
            dataset,
            batch_concurrency,
        } => {
            if let Some(host) = host {
                map.insert("server.host".to_string(), host.clone());
            }
            if let Some(port) = port {
                map.insert("server.port".to_string(), port.to_string());
            }
            if let Some(dataset) = dataset {
                map.insert(
                    "catalog.dataset_path".to_string(),
                    dataset.display().to_string(),
                );
            }
            if let Some(concurrency) = batch_concurrency {
                map.insert(
                    "server.batch_concurrency".to_string(),
                    concurrency.to_string(),
                );
            }
        }
        Commands::Evaluate {
            timeout: Some(timeout),
            ..
        } => {
            map.insert("harness.timeout".to_string(), timeout.clone());
        }
        Commands::Task {
            dataset: Some(dataset),
            ..
        } => {
            map.insert(
                "catalog.dataset_path".to_string(),
                dataset.display().to_string(),
            );
        }
        _ => {}
    }

    map
}
