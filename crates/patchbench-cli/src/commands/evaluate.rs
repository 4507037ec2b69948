//! `patchbench evaluate`: one-shot evaluation from the command line

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use patchbench_core::config::AppConfig;
use patchbench_core::error::BenchError;
use patchbench_eval::{EvalErrorKind, EvalOrchestrator, EvaluationOutcome};
use tokio::io::AsyncReadExt;

use crate::console::CliConsole;

/// Evaluate the patch at `patch_path` ('-' for stdin) against `task_id`.
///
/// A failed evaluation is returned as an error so the process exits non-zero;
/// an unresolved but completed evaluation is not a failure.
pub async fn run(config: &AppConfig, task_id: &str, patch_path: &Path, json: bool) -> Result<()> {
    let patch = read_patch(patch_path).await?;
    let orchestrator = EvalOrchestrator::new(config.harness.clone());
    let console = CliConsole::new(true);

    let spinner = (!json).then(|| console.spinner(&format!("Evaluating {}", task_id)));
    let result = orchestrator.try_evaluate(task_id, &patch).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let outcome = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&console, &outcome);
    }

    exit_result(&outcome, config.harness.timeout)?;
    Ok(())
}

/// A completed evaluation succeeds whether or not it resolved the task
fn exit_result(outcome: &EvaluationOutcome, timeout: Duration) -> Result<(), BenchError> {
    match outcome.error_kind {
        None => Ok(()),
        Some(EvalErrorKind::Timeout) => Err(BenchError::timeout(timeout.as_secs())),
        Some(kind) => Err(BenchError::harness(format!("evaluation failed ({})", kind))),
    }
}

async fn read_patch(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut patch = String::new();
        tokio::io::stdin()
            .read_to_string(&mut patch)
            .await
            .context("failed to read patch from stdin")?;
        return Ok(patch);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read patch file {}", path.display()))
}

fn print_outcome(console: &CliConsole, outcome: &EvaluationOutcome) {
    console.print_header(&format!("Evaluation of {}", outcome.task_id));
    if let Some(run_id) = &outcome.run_id {
        console.info(&format!("Run: {}", run_id));
    }

    match (&outcome.error_message, outcome.resolved) {
        (Some(message), _) => {
            let kind = outcome
                .error_kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "error".to_string());
            console.error(&format!("Evaluation failed ({})", kind));
            eprintln!("{}", message);
        }
        (None, true) => console.success("Resolved"),
        (None, false) => console.warn("Not resolved"),
    }
}
