//! Prediction records handed to the harness

use serde::{Deserialize, Serialize};

/// One line of a predictions file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub instance_id: String,
    pub model_name_or_path: String,
    pub model_patch: String,
}

impl PredictionRecord {
    pub fn new(
        instance_id: impl Into<String>,
        model_name_or_path: impl Into<String>,
        model_patch: impl Into<String>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            model_name_or_path: model_name_or_path.into(),
            model_patch: model_patch.into(),
        }
    }

    /// Serialize as a single JSON Lines record, newline included
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
