//! Run identifiers and the transient prediction file of one run

use std::io::Write;
use std::path::{Path, PathBuf};

use patchbench_core::config::HarnessConfig;
use patchbench_core::error::{BenchError, BenchResult};
use tempfile::TempPath;
use uuid::Uuid;

use crate::prediction::PredictionRecord;

/// Reject task ids that could escape a path or break the harness command line
pub fn validate_task_id(task_id: &str) -> BenchResult<()> {
    if task_id.is_empty() {
        return Err(BenchError::invalid_input_field(
            "task_id must not be empty",
            "task_id",
        ));
    }
    if task_id == "." || task_id == ".." {
        return Err(BenchError::invalid_input_field(
            format!("task_id '{}' is not allowed", task_id),
            "task_id",
        ));
    }
    if let Some(bad) = task_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(BenchError::invalid_input_field(
            format!("task_id contains invalid character {:?}", bad),
            "task_id",
        ));
    }
    Ok(())
}

/// Everything that identifies one harness run.
///
/// The prediction file is owned by the descriptor and removed when it is
/// dropped or cleaned up, whichever comes first.
#[derive(Debug)]
pub struct RunDescriptor {
    run_id: String,
    task_id: String,
    prediction: TempPath,
}

impl RunDescriptor {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Absolute path of the prediction file
    pub fn prediction_path(&self) -> &Path {
        &self.prediction
    }

    /// Remove the prediction file now, logging instead of failing
    pub fn cleanup(self) {
        let path = self.prediction.to_path_buf();
        if let Err(e) = self.prediction.close() {
            tracing::warn!(
                run_id = %self.run_id,
                path = %path.display(),
                error = %e,
                "Failed to remove prediction file"
            );
        }
    }
}

/// Creates run descriptors with fresh run ids
#[derive(Debug, Clone)]
pub struct RunDescriptorBuilder {
    run_id_prefix: String,
    model_name: String,
    prediction_dir: Option<PathBuf>,
}

impl RunDescriptorBuilder {
    pub fn new(run_id_prefix: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            run_id_prefix: run_id_prefix.into(),
            model_name: model_name.into(),
            prediction_dir: None,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        let builder = Self::new(&config.run_id_prefix, &config.model_name);
        match &config.prediction_dir {
            Some(dir) => builder.with_prediction_dir(dir),
            None => builder,
        }
    }

    /// Place prediction files in `dir` instead of the system temp dir
    pub fn with_prediction_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prediction_dir = Some(dir.into());
        self
    }

    /// Run id for a task and a unique token
    pub fn run_id_for(&self, task_id: &str, token: &str) -> String {
        format!("{}-{}-{}", self.run_id_prefix, task_id, token)
    }

    /// Validate the task id, mint a run id and write the prediction file
    pub fn build(&self, task_id: &str, patch: &str) -> BenchResult<RunDescriptor> {
        validate_task_id(task_id)?;

        let token = Uuid::new_v4().simple().to_string();
        let run_id = self.run_id_for(task_id, &token);

        let record = PredictionRecord::new(task_id, &self.model_name, patch);
        let line = record.to_json_line()?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("prediction-").suffix(".jsonl");

        let mut file = match &self.prediction_dir {
            Some(dir) => {
                let dir = std::path::absolute(dir).map_err(|e| {
                    BenchError::io_with_path(
                        format!("Failed to resolve prediction directory: {}", e),
                        dir.display().to_string(),
                    )
                })?;
                std::fs::create_dir_all(&dir).map_err(|e| {
                    BenchError::io_with_path(
                        format!("Failed to create prediction directory: {}", e),
                        dir.display().to_string(),
                    )
                })?;
                builder.tempfile_in(&dir)
            }
            None => builder.tempfile(),
        }
        .map_err(|e| BenchError::io(format!("Failed to create prediction file: {}", e)))?;

        // On a failed write the NamedTempFile is dropped and removed here
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| {
                BenchError::io_with_path(
                    format!("Failed to write prediction file: {}", e),
                    file.path().display().to_string(),
                )
            })?;

        let prediction = file.into_temp_path();
        tracing::debug!(
            run_id = %run_id,
            path = %prediction.display(),
            "Prediction file written"
        );

        Ok(RunDescriptor {
            run_id,
            task_id: task_id.to_string(),
            prediction,
        })
    }
}
