//! From trait implementations for BenchError conversions

use super::types::BenchError;

impl From<anyhow::Error> for BenchError {
    fn from(error: anyhow::Error) -> Self {
        Self::other(error.to_string())
    }
}

impl From<std::io::Error> for BenchError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<config::ConfigError> for BenchError {
    fn from(error: config::ConfigError) -> Self {
        match error {
            config::ConfigError::NotFound(key) => {
                Self::config(format!("Missing configuration key: {}", key))
            }
            config::ConfigError::FileParse { uri, cause } => Self::config_with_context(
                format!("Failed to parse configuration file: {}", cause),
                uri.unwrap_or_else(|| "<unknown>".to_string()),
            ),
            other => Self::config(other.to_string()),
        }
    }
}
