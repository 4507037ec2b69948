//! Configuration management commands

use anyhow::Result;
use patchbench_core::config::AppConfig;

use crate::args::ConfigFormat;
use crate::console::CliConsole;

/// Print the effective configuration
pub async fn show(config: &AppConfig, format: ConfigFormat) -> Result<()> {
    let rendered = match format {
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    println!("{}", rendered);
    Ok(())
}

/// Print a summary; loading already validated the configuration
pub async fn validate(config: &AppConfig) -> Result<()> {
    let console = CliConsole::new(true);

    console.print_header("Configuration Validation");
    console.success("Configuration is valid");

    let harness = &config.harness;
    console.info(&format!(
        "Server: {}:{} (batch concurrency {})",
        config.server.host, config.server.port, config.server.batch_concurrency
    ));
    console.info(&format!(
        "Harness: {} {}",
        harness.program,
        harness.args.join(" ")
    ));
    console.info(&format!(
        "Timeout: {}s, settle wait: {}ms",
        harness.timeout.as_secs(),
        harness.settle.max_wait.as_millis()
    ));
    match &config.catalog.dataset_path {
        Some(path) => console.info(&format!("Dataset: {}", path.display())),
        None => console.warn("No dataset configured; task lookups are disabled"),
    }
    Ok(())
}
