//! Request and response bodies of the HTTP API

use patchbench_eval::EvaluationRequest;
use serde::{Deserialize, Serialize};

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// `ready` or `unavailable`
    pub catalog: String,
    pub version: String,
}

/// Body of `POST /api/v1/tasks/batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskBatchRequest {
    pub task_ids: Vec<String>,
}

/// Body of `POST /api/v1/evaluate/batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationBatchRequest {
    pub predictions: Vec<EvaluationRequest>,
}

/// Error body for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
