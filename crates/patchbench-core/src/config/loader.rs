//! Configuration loading
//!
//! Sources are layered in the order they are added, later sources overriding
//! earlier ones. The built-in defaults are always the bottom layer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};

use super::defaults::ENV_PREFIX;

/// Keys whose environment value is a comma separated list
const ENV_LIST_KEYS: &[&str] = &["harness.args", "harness.env"];
use super::model::AppConfig;
use crate::error::{BenchError, BenchResult};

/// Source of configuration data
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Configuration file; format is inferred from the extension
    File { path: PathBuf, required: bool },
    /// `PATCHBENCH_<SECTION>__<KEY>` environment variables
    Environment,
    /// Dotted-key overrides, typically from command line flags
    Overrides(HashMap<String, String>),
}

/// Configuration loader with support for multiple sources
#[derive(Debug, Default)]
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration source
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Add a file source that may be absent
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File {
            path: path.as_ref().to_path_buf(),
            required: false,
        })
    }

    /// Add a file source that must exist
    pub fn with_required_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File {
            path: path.as_ref().to_path_buf(),
            required: true,
        })
    }

    /// Add environment variables source
    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    /// Add dotted-key overrides such as `server.port`
    pub fn with_overrides(self, overrides: HashMap<String, String>) -> Self {
        self.add_source(ConfigSource::Overrides(overrides))
    }

    /// Load configuration from all sources
    pub fn load(self) -> BenchResult<AppConfig> {
        let defaults = Config::try_from(&AppConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        for source in self.sources {
            builder = match source {
                ConfigSource::File { path, required } => {
                    tracing::debug!(path = %path.display(), required, "adding config file");
                    builder.add_source(File::from(path).required(required))
                }
                ConfigSource::Environment => builder.add_source(environment()),
                ConfigSource::Overrides(overrides) => {
                    let mut builder = builder;
                    for (key, value) in overrides {
                        builder = builder.set_override(key, value)?;
                    }
                    builder
                }
            };
        }

        let config: AppConfig = builder
            .build()?
            .try_deserialize()
            .map_err(|e| BenchError::config(format!("Invalid configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }
}

fn environment() -> Environment {
    ENV_LIST_KEYS.iter().fold(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(","),
        |env, key| env.with_list_parse_key(key),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_load_defaults_without_sources() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.harness.timeout, Duration::from_secs(1800));
        assert!(config.catalog.dataset_path.is_none());
    }

    #[test]
    fn test_missing_optional_file_is_ignored() {
        let config = ConfigLoader::new()
            .with_file("/definitely/not/here/patchbench.toml")
            .load()
            .unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_missing_required_file_fails() {
        let result = ConfigLoader::new()
            .with_required_file("/definitely/not/here/patchbench.toml")
            .load();
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[server]
port = 9100
batch_concurrency = 4

[harness]
program = "/opt/harness/run.sh"
args = []
timeout = "45m"

[harness.settle]
max_wait = "10s"

[catalog]
dataset_path = "/data/swe-bench.jsonl"

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = ConfigLoader::new().with_file(file.path()).load().unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.batch_concurrency, 4);
        assert_eq!(config.harness.program, "/opt/harness/run.sh");
        assert!(config.harness.args.is_empty());
        assert_eq!(config.harness.timeout, Duration::from_secs(45 * 60));
        assert_eq!(config.harness.settle.max_wait, Duration::from_secs(10));
        // untouched keys keep their defaults
        assert_eq!(config.harness.dataset_name, "princeton-nlp/SWE-bench");
        assert_eq!(
            config.catalog.dataset_path,
            Some(PathBuf::from("/data/swe-bench.jsonl"))
        );
        assert_eq!(config.logging.format, crate::config::LogFormat::Json);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "[server]\nport = 9100\n").unwrap();

        let mut overrides = HashMap::new();
        overrides.insert("server.port".to_string(), "9200".to_string());

        let config = ConfigLoader::new()
            .with_file(file.path())
            .with_overrides(overrides)
            .load()
            .unwrap();
        assert_eq!(config.server.port, 9200);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "[server]\nbatch_concurrency = 0\n").unwrap();

        let result = ConfigLoader::new().with_file(file.path()).load();
        assert!(result.is_err());
    }

    #[test]
    fn test_list_values_from_environment() {
        // Only this test reads the process environment in this crate
        unsafe {
            std::env::set_var("PATCHBENCH_HARNESS__ENV", "DOCKER_HOST=tcp://docker:2375,PB_MODE=ci");
            std::env::set_var("PATCHBENCH_HARNESS__ARGS", "-m,swebench.harness.run_evaluation");
            std::env::set_var("PATCHBENCH_SERVER__PORT", "9300");
        }
        let result = ConfigLoader::new().with_env().load();
        unsafe {
            std::env::remove_var("PATCHBENCH_HARNESS__ENV");
            std::env::remove_var("PATCHBENCH_HARNESS__ARGS");
            std::env::remove_var("PATCHBENCH_SERVER__PORT");
        }

        let config = result.unwrap();
        assert_eq!(
            config.harness.env,
            vec!["DOCKER_HOST=tcp://docker:2375", "PB_MODE=ci"]
        );
        assert_eq!(
            config.harness.args,
            vec!["-m", "swebench.harness.run_evaluation"]
        );
        assert_eq!(config.server.port, 9300);
        // scalar string values are not split
        assert_eq!(config.harness.dataset_name, "princeton-nlp/SWE-bench");
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "[harness]\ntimeout = \"0s\"\n").unwrap();

        let err = ConfigLoader::new().with_file(file.path()).load().unwrap_err();
        assert!(err.to_string().contains("timeout"), "{}", err);
    }
}
