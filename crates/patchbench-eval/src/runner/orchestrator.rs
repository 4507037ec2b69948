//! Evaluation orchestrator
//!
//! Turns one `(task_id, patch)` pair into exactly one [`EvaluationOutcome`]:
//! write the prediction, run the harness, collect the result artifact and
//! release every transient file on the way out.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use patchbench_core::config::HarnessConfig;
use patchbench_core::error::{BenchError, BenchResult, UnifiedError};
use tracing::{debug, info, warn};

use super::artifact::{read_result_artifact, remove_artifact};
use super::descriptor::{RunDescriptor, RunDescriptorBuilder};
use super::diagnostics::{RunLog, truncate_tail};
use super::harness::{HarnessCommand, HarnessOutput, HarnessRunError};
use super::settle::{ArtifactPoller, Settled};
use crate::outcome::{EvalErrorKind, EvaluationOutcome, EvaluationRequest};

/// Drives the external harness; cheap to clone and safe to share
#[derive(Debug, Clone)]
pub struct EvalOrchestrator {
    config: Arc<HarnessConfig>,
    builder: RunDescriptorBuilder,
    poller: ArtifactPoller,
}

impl EvalOrchestrator {
    pub fn new(config: HarnessConfig) -> Self {
        let builder = RunDescriptorBuilder::from_config(&config);
        let poller = ArtifactPoller::new(config.settle.clone());
        Self {
            config: Arc::new(config),
            builder,
            poller,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Evaluate one patch, surfacing input and resource errors to the caller
    pub async fn try_evaluate(&self, task_id: &str, patch: &str) -> BenchResult<EvaluationOutcome> {
        self.ensure_logs_dir().await?;
        let descriptor = self.builder.build(task_id, patch)?;

        info!(
            run_id = %descriptor.run_id(),
            task_id = %task_id,
            "Starting evaluation"
        );
        let outcome = self.run(&descriptor).await;
        descriptor.cleanup();

        info!(
            run_id = outcome.run_id.as_deref().unwrap_or_default(),
            task_id = %task_id,
            resolved = outcome.resolved,
            error_kind = outcome.error_kind.map(|k| k.as_str()).unwrap_or("none"),
            "Evaluation finished"
        );
        Ok(outcome)
    }

    /// Evaluate one patch; never fails, every error becomes an outcome
    pub async fn evaluate(&self, task_id: &str, patch: &str) -> EvaluationOutcome {
        match self.try_evaluate(task_id, patch).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    task_id = %task_id,
                    code = e.error_code(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "Evaluation could not start"
                );
                EvaluationOutcome::from_error(task_id, &e)
            }
        }
    }

    /// Evaluate many patches, at most `concurrency` at a time, preserving order
    pub async fn evaluate_batch(
        &self,
        requests: Vec<EvaluationRequest>,
        concurrency: usize,
    ) -> Vec<EvaluationOutcome> {
        self.evaluate_batch_with(requests, concurrency, |_| None).await
    }

    /// Like [`evaluate_batch`](Self::evaluate_batch), but `precheck` may answer
    /// a request without running the harness
    pub async fn evaluate_batch_with<F>(
        &self,
        requests: Vec<EvaluationRequest>,
        concurrency: usize,
        precheck: F,
    ) -> Vec<EvaluationOutcome>
    where
        F: Fn(&EvaluationRequest) -> Option<EvaluationOutcome>,
    {
        let total = requests.len();
        info!(total, concurrency, "Starting batch evaluation");

        let precheck = &precheck;
        let outcomes: Vec<EvaluationOutcome> = stream::iter(requests)
            .map(move |request| async move {
                if let Some(outcome) = precheck(&request) {
                    return outcome;
                }
                self.evaluate(&request.task_id, &request.prediction).await
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let resolved = outcomes.iter().filter(|o| o.resolved).count();
        info!(total, resolved, "Batch evaluation finished");
        outcomes
    }

    async fn ensure_logs_dir(&self) -> BenchResult<()> {
        tokio::fs::create_dir_all(&self.config.logs_dir)
            .await
            .map_err(|e| {
                BenchError::io_with_path(
                    format!("Failed to create logs directory: {}", e),
                    self.config.logs_dir.display().to_string(),
                )
            })
    }

    async fn run(&self, descriptor: &RunDescriptor) -> EvaluationOutcome {
        let run_id = descriptor.run_id();
        let task_id = descriptor.task_id();
        let command = HarnessCommand::for_run(&self.config, descriptor);
        let artifact = self.config.result_artifact_path(run_id);

        debug!(run_id = %run_id, command = %command.display(), "Launching harness");
        let result = command.run().await;
        self.record(descriptor, &command, &result).await;

        let failed = |kind: EvalErrorKind, message: String| {
            EvaluationOutcome::failed(task_id, Some(run_id.to_string()), kind, message)
        };

        match result {
            Err(HarnessRunError::Launch { program, source }) => failed(
                EvalErrorKind::LaunchFailed,
                format!("Evaluation failed: could not launch harness '{}': {}", program, source),
            ),
            Err(HarnessRunError::Wait(e)) => failed(
                EvalErrorKind::LaunchFailed,
                format!("Evaluation failed: could not wait for harness: {}", e),
            ),
            Err(HarnessRunError::TimedOut { after, stdout, stderr }) => {
                remove_artifact(&artifact).await;
                failed(
                    EvalErrorKind::Timeout,
                    format!(
                        "Evaluation timed out after {}s and the harness was killed. Stdout: {}, Stderr: {}",
                        after.as_secs(),
                        self.quote(&stdout),
                        self.quote(&stderr)
                    ),
                )
            }
            Ok(output) if !output.success() => {
                remove_artifact(&artifact).await;
                failed(
                    EvalErrorKind::NonZeroExit,
                    format!(
                        "Evaluation failed: harness exited with {}. Stdout: {}, Stderr: {}",
                        output.status_text(),
                        self.quote(&output.stdout),
                        self.quote(&output.stderr)
                    ),
                )
            }
            Ok(output) => self.collect(task_id, run_id, &artifact, &output).await,
        }
    }

    async fn collect(
        &self,
        task_id: &str,
        run_id: &str,
        artifact: &Path,
        output: &HarnessOutput,
    ) -> EvaluationOutcome {
        let settled = self
            .poller
            .settle(artifact, || read_result_artifact(artifact))
            .await;

        match settled {
            Settled::Ready(raw) => {
                remove_artifact(artifact).await;
                EvaluationOutcome::completed(task_id, run_id, raw)
            }
            Settled::Invalid(e) => {
                remove_artifact(artifact).await;
                EvaluationOutcome::failed(
                    task_id,
                    Some(run_id.to_string()),
                    EvalErrorKind::MalformedArtifact,
                    format!("Evaluation failed: {}", e),
                )
            }
            Settled::Missing => EvaluationOutcome::failed(
                task_id,
                Some(run_id.to_string()),
                EvalErrorKind::MissingArtifact,
                format!(
                    "Evaluation failed: no result file at {}. Stdout: {}, Stderr: {}",
                    artifact.display(),
                    self.quote(&output.stdout),
                    self.quote(&output.stderr)
                ),
            ),
        }
    }

    /// Log the captured output and persist the run log
    async fn record(
        &self,
        descriptor: &RunDescriptor,
        command: &HarnessCommand,
        result: &Result<HarnessOutput, HarnessRunError>,
    ) {
        let run_id = descriptor.run_id();
        let (status, elapsed_ms, stdout, stderr) = match result {
            Ok(output) => (
                output.status_text(),
                output.elapsed.as_millis(),
                output.stdout.as_str(),
                output.stderr.as_str(),
            ),
            Err(HarnessRunError::TimedOut { after, stdout, stderr }) => (
                format!("timed out after {}s", after.as_secs()),
                after.as_millis(),
                stdout.as_str(),
                stderr.as_str(),
            ),
            Err(e) => (e.to_string(), 0, "", ""),
        };

        let succeeded = matches!(result, Ok(output) if output.success());
        if succeeded {
            debug!(run_id = %run_id, elapsed_ms = elapsed_ms as u64, stdout, stderr, "Harness finished");
        } else {
            info!(
                run_id = %run_id,
                status = %status,
                elapsed_ms = elapsed_ms as u64,
                stdout,
                stderr,
                "Harness did not succeed"
            );
        }

        if self.config.persist_harness_logs {
            let log = RunLog {
                run_id,
                task_id: descriptor.task_id(),
                command: &command.display(),
                status: &status,
                elapsed_ms,
                stdout,
                stderr,
            };
            if let Some(path) = log.persist(&self.config.logs_dir).await {
                debug!(run_id = %run_id, path = %path.display(), "Harness log written");
            }
        }
    }

    fn quote(&self, text: &str) -> String {
        truncate_tail(text, self.config.max_output_chars).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbench_core::config::SettleConfig;

    fn orchestrator(dir: &Path) -> EvalOrchestrator {
        EvalOrchestrator::new(
            HarnessConfig::new("/nonexistent/harness", Vec::new())
                .with_working_dir(dir)
                .with_logs_dir(dir.join("logs"))
                .with_prediction_dir(dir.join("predictions"))
                .with_settle(SettleConfig::immediate()),
        )
    }

    #[tokio::test]
    async fn test_invalid_task_id_is_surfaced_by_try_evaluate() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());

        let err = orchestrator.try_evaluate("../escape", "diff").await.unwrap_err();
        assert!(matches!(err, BenchError::InvalidInput { .. }));

        let outcome = orchestrator.evaluate("../escape", "diff").await;
        assert_eq!(outcome.error_kind, Some(EvalErrorKind::InvalidRequest));
        assert!(!outcome.resolved);
    }

    #[tokio::test]
    async fn test_launch_failure_becomes_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());

        let outcome = orchestrator.evaluate("t", "diff").await;
        assert_eq!(outcome.error_kind, Some(EvalErrorKind::LaunchFailed));
        assert!(outcome.run_id.is_some());
        assert!(
            outcome
                .error_message
                .as_deref()
                .unwrap_or_default()
                .contains("/nonexistent/harness")
        );

        let leftovers = std::fs::read_dir(dir.path().join("predictions")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_unwritable_logs_dir_is_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        let orchestrator = EvalOrchestrator::new(
            HarnessConfig::default().with_logs_dir(blocker.join("logs")),
        );
        let err = orchestrator.try_evaluate("t", "").await.unwrap_err();
        assert!(matches!(err, BenchError::Io { .. }));

        let outcome = orchestrator.evaluate("t", "").await;
        assert_eq!(outcome.error_kind, Some(EvalErrorKind::Resource));
    }

    #[tokio::test]
    async fn test_precheck_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(dir.path());

        let outcomes = orchestrator
            .evaluate_batch_with(
                vec![EvaluationRequest::new("known", ""), EvaluationRequest::new("unknown", "")],
                2,
                |request| {
                    (request.task_id == "unknown").then(|| {
                        EvaluationOutcome::failed(
                            &request.task_id,
                            None,
                            EvalErrorKind::UnknownTask,
                            "Task unknown not found in dataset",
                        )
                    })
                },
            )
            .await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].task_id, "known");
        assert_eq!(outcomes[0].error_kind, Some(EvalErrorKind::LaunchFailed));
        assert_eq!(outcomes[1].error_kind, Some(EvalErrorKind::UnknownTask));
    }
}
