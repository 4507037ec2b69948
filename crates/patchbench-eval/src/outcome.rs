//! Evaluation requests and outcomes
//!
//! An [`EvaluationOutcome`] built by [`EvaluationOutcome::completed`],
//! [`EvaluationOutcome::failed`] or [`EvaluationOutcome::from_error`] carries
//! exactly one of a parsed harness result or an error message. The fields
//! stay public for callers and deserialized outcomes, which are not checked.

use chrono::{DateTime, Utc};
use patchbench_core::error::BenchError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A patch submitted for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub task_id: String,
    /// Unified diff; may be empty or malformed, the harness decides
    #[serde(alias = "patch")]
    pub prediction: String,
}

impl EvaluationRequest {
    pub fn new(task_id: impl Into<String>, prediction: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            prediction: prediction.into(),
        }
    }
}

/// Why an evaluation produced no harness result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalErrorKind {
    /// The task id cannot be used (empty or unsafe characters)
    InvalidRequest,
    /// The task id is not in the catalog
    UnknownTask,
    /// Transient files or directories could not be created
    Resource,
    /// The harness process could not be started or awaited
    LaunchFailed,
    /// The harness exited with a non-zero status
    NonZeroExit,
    /// The harness exceeded its time limit and was killed
    Timeout,
    /// No result artifact appeared after the settle poll
    MissingArtifact,
    /// The result artifact was not a JSON object
    MalformedArtifact,
}

impl EvalErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalErrorKind::InvalidRequest => "invalid_request",
            EvalErrorKind::UnknownTask => "unknown_task",
            EvalErrorKind::Resource => "resource",
            EvalErrorKind::LaunchFailed => "launch_failed",
            EvalErrorKind::NonZeroExit => "non_zero_exit",
            EvalErrorKind::Timeout => "timeout",
            EvalErrorKind::MissingArtifact => "missing_artifact",
            EvalErrorKind::MalformedArtifact => "malformed_artifact",
        }
    }
}

impl std::fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized result of one evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub task_id: String,

    /// Mirrors the harness's own `resolved` field; false on any failure
    #[serde(rename = "is_resolved")]
    pub resolved: bool,

    /// Run identifier, absent only when no run could be prepared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Full parsed result artifact
    #[serde(rename = "test_results", default)]
    pub raw_result: Option<Map<String, Value>>,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<EvalErrorKind>,

    pub completed_at: DateTime<Utc>,
}

impl EvaluationOutcome {
    /// Outcome for a parsed result artifact
    pub fn completed(
        task_id: impl Into<String>,
        run_id: impl Into<String>,
        raw_result: Map<String, Value>,
    ) -> Self {
        let resolved = raw_result
            .get("resolved")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Self {
            task_id: task_id.into(),
            resolved,
            run_id: Some(run_id.into()),
            raw_result: Some(raw_result),
            error_message: None,
            error_kind: None,
            completed_at: Utc::now(),
        }
    }

    /// Outcome for a failed evaluation
    pub fn failed(
        task_id: impl Into<String>,
        run_id: Option<String>,
        kind: EvalErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            resolved: false,
            run_id,
            raw_result: None,
            error_message: Some(message.into()),
            error_kind: Some(kind),
            completed_at: Utc::now(),
        }
    }

    /// Outcome for an error raised before the harness was launched
    pub fn from_error(task_id: impl Into<String>, error: &BenchError) -> Self {
        let kind = match error {
            BenchError::InvalidInput { .. } => EvalErrorKind::InvalidRequest,
            BenchError::NotFound { .. } => EvalErrorKind::UnknownTask,
            _ => EvalErrorKind::Resource,
        };
        Self::failed(task_id, None, kind, error.to_string())
    }

    /// Whether the harness produced a parsed result
    pub fn is_success(&self) -> bool {
        self.raw_result.is_some()
    }
}
