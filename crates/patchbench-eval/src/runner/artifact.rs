//! Reading and disposing of the harness result artifact

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read result artifact {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed result artifact {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// Parse the artifact at `path`; only a JSON object is accepted
pub async fn read_result_artifact(path: &Path) -> Result<Map<String, Value>, ArtifactError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ArtifactError::Malformed {
            path: path.to_path_buf(),
            reason: format!("expected a JSON object, found {}", json_type_name(&other)),
        }),
        Err(e) => Err(ArtifactError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Delete the artifact if present; failures are logged, never raised
pub async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Result artifact removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to remove result artifact"
        ),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
