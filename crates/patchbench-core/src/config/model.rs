//! Configuration model
//!
//! Every section is fully defaulted so an empty file (or no file at all)
//! yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults;
use crate::error::{BenchError, BenchResult};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// External harness settings
    pub harness: HarnessConfig,

    /// Task catalog settings
    pub catalog: CatalogConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> BenchResult<()> {
        if self.server.batch_concurrency == 0 {
            return Err(BenchError::invalid_input_field(
                "batch_concurrency must be at least 1",
                "server.batch_concurrency",
            ));
        }
        self.harness.validate()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Harness runs driven at once by a batch request
    pub batch_concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::server::HOST.to_string(),
            port: defaults::server::PORT,
            batch_concurrency: defaults::server::BATCH_CONCURRENCY,
        }
    }
}

/// How the external evaluation harness is launched and observed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Executable to launch
    pub program: String,

    /// Arguments placed before the per-run flags
    pub args: Vec<String>,

    /// Value of `--dataset_name`
    pub dataset_name: String,

    /// Model tag written into every prediction record
    pub model_name: String,

    /// Prefix of every run identifier
    pub run_id_prefix: String,

    /// Working directory of the harness process
    pub working_dir: PathBuf,

    /// Directory the harness writes its result artifact into (defaults to `working_dir`)
    pub result_dir: Option<PathBuf>,

    /// Result artifact file name; `{run_id}` and `{model}` are substituted
    pub result_file_template: String,

    /// Directory receiving per-run diagnostics
    pub logs_dir: PathBuf,

    /// Directory for prediction files (system temp dir when unset)
    pub prediction_dir: Option<PathBuf>,

    /// Extra `KEY=VALUE` environment for the harness, on top of the inherited one
    pub env: Vec<String>,

    /// Hard limit for one harness run
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Post-exit artifact poll
    pub settle: SettleConfig,

    /// Characters of each output stream quoted in error messages
    pub max_output_chars: usize,

    /// Write `<logs_dir>/<run_id>.log` for every run
    pub persist_harness_logs: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            program: defaults::harness::PROGRAM.to_string(),
            args: defaults::harness::ARGS.iter().map(|a| a.to_string()).collect(),
            dataset_name: defaults::harness::DATASET_NAME.to_string(),
            model_name: defaults::harness::MODEL_NAME.to_string(),
            run_id_prefix: defaults::harness::RUN_ID_PREFIX.to_string(),
            working_dir: PathBuf::from("."),
            result_dir: None,
            result_file_template: defaults::harness::RESULT_FILE_TEMPLATE.to_string(),
            logs_dir: PathBuf::from(defaults::harness::LOGS_DIR),
            prediction_dir: None,
            env: vec![format!("DOCKER_HOST={}", defaults::harness::DOCKER_HOST)],
            timeout: defaults::harness::timeout(),
            settle: SettleConfig::default(),
            max_output_chars: defaults::harness::MAX_OUTPUT_CHARS,
            persist_harness_logs: true,
        }
    }
}

impl HarnessConfig {
    /// Create a config launching `program` with the given leading arguments
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            ..Default::default()
        }
    }

    /// Set the harness working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Set the diagnostics directory
    pub fn with_logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = dir.into();
        self
    }

    /// Set the prediction file directory
    pub fn with_prediction_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prediction_dir = Some(dir.into());
        self
    }

    /// Set the per-run timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the artifact poll
    pub fn with_settle(mut self, settle: SettleConfig) -> Self {
        self.settle = settle;
        self
    }

    /// Add an environment variable for the harness
    pub fn with_env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env.push(format!("{}={}", key.as_ref(), value.as_ref()));
        self
    }

    /// Environment overrides as key/value pairs, later entries winning
    pub fn env_pairs(&self) -> Vec<(&str, &str)> {
        self.env
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .collect()
    }

    /// Directory the result artifact is expected in
    pub fn effective_result_dir(&self) -> PathBuf {
        self.result_dir
            .clone()
            .unwrap_or_else(|| self.working_dir.clone())
    }

    /// Result artifact path for a run; a pure function of the run identifier
    pub fn result_artifact_path(&self, run_id: &str) -> PathBuf {
        let file_name = self
            .result_file_template
            .replace("{run_id}", run_id)
            .replace("{model}", &self.model_name);
        self.effective_result_dir().join(file_name)
    }

    /// Check constraints on the harness section
    pub fn validate(&self) -> BenchResult<()> {
        if self.program.trim().is_empty() {
            return Err(BenchError::invalid_input_field(
                "harness program must not be empty",
                "harness.program",
            ));
        }
        if !self.result_file_template.contains("{run_id}") {
            return Err(BenchError::invalid_input_field(
                "result_file_template must contain {run_id}",
                "harness.result_file_template",
            ));
        }
        if let Some(entry) = self
            .env
            .iter()
            .find(|entry| entry.split_once('=').is_none_or(|(key, _)| key.is_empty()))
        {
            return Err(BenchError::invalid_input_field(
                format!("harness env entry '{}' is not KEY=VALUE", entry),
                "harness.env",
            ));
        }
        if self.timeout.is_zero() {
            return Err(BenchError::invalid_input_field(
                "harness timeout must be greater than zero",
                "harness.timeout",
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(BenchError::invalid_input_field(
                "model_name must not be empty",
                "harness.model_name",
            ));
        }
        self.settle.validate()
    }
}

/// Bounded exponential poll for the result artifact after the harness exits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    /// Delay before the second check
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Cap for a single delay
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,

    /// Total wait before the artifact is declared missing
    #[serde(with = "humantime_serde")]
    pub max_wait: Duration,

    /// Growth factor between delays
    pub multiplier: f64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            initial_delay: defaults::settle::initial_delay(),
            max_delay: defaults::settle::max_delay(),
            max_wait: defaults::settle::max_wait(),
            multiplier: defaults::settle::MULTIPLIER,
        }
    }
}

impl SettleConfig {
    /// A poll that checks exactly once
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_wait: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Set the total wait
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn validate(&self) -> BenchResult<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(BenchError::invalid_input_field(
                "settle multiplier must be a finite number >= 1.0",
                "harness.settle.multiplier",
            ));
        }
        Ok(())
    }
}

/// Task catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON array or JSON Lines export of the task corpus
    pub dataset_path: Option<PathBuf>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}
