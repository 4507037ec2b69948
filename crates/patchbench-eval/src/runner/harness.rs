//! Launching and supervising one harness process

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use patchbench_core::config::HarnessConfig;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::descriptor::RunDescriptor;

/// How long output readers may keep draining after the process is gone.
/// Grandchildren that inherited the pipes can hold them open indefinitely.
const OUTPUT_GRACE: Duration = Duration::from_secs(5);

/// Errors that prevent a harness run from producing an exit status
#[derive(Debug, Error)]
pub enum HarnessRunError {
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for harness: {0}")]
    Wait(#[source] std::io::Error),

    #[error("harness timed out after {}s", .after.as_secs())]
    TimedOut {
        after: Duration,
        stdout: String,
        stderr: String,
    },
}

/// Captured result of a harness process that ran to completion
#[derive(Debug, Clone)]
pub struct HarnessOutput {
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl HarnessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human readable exit status
    pub fn status_text(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "termination by signal".to_string(),
        }
    }
}

/// Fully resolved command line for one run
#[derive(Debug, Clone)]
pub struct HarnessCommand {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    env: Vec<(String, String)>,
    timeout: Duration,
}

impl HarnessCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: PathBuf::from("."),
            env: Vec::new(),
            timeout: patchbench_core::config::defaults::harness::timeout(),
        }
    }

    /// The invocation for one run: configured leading arguments, then the per-run flags
    pub fn for_run(config: &HarnessConfig, descriptor: &RunDescriptor) -> Self {
        let mut args = config.args.clone();
        args.extend([
            "--dataset_name".to_string(),
            config.dataset_name.clone(),
            "--predictions_path".to_string(),
            descriptor.prediction_path().to_string_lossy().into_owned(),
            "--max_workers".to_string(),
            "1".to_string(),
            "--instance_ids".to_string(),
            descriptor.task_id().to_string(),
            "--run_id".to_string(),
            descriptor.run_id().to_string(),
        ]);

        Self {
            program: config.program.clone(),
            args,
            working_dir: config.working_dir.clone(),
            env: config
                .env_pairs()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            timeout: config.timeout,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command line for logs, quoting arguments with whitespace
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("'{}'", part)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion or until the timeout, capturing both output streams
    pub async fn run(&self) -> Result<HarnessOutput, HarnessRunError> {
        let start = Instant::now();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        // Own process group, so a timeout can take the whole tree down
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| HarnessRunError::Launch {
            program: self.program.clone(),
            source,
        })?;
        let pid = child.id();
        tracing::debug!(pid = ?pid, program = %self.program, "Harness process started");

        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        match timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let stdout = collect_stream(stdout_task).await;
                let stderr = collect_stream(stderr_task).await;
                Ok(HarnessOutput {
                    exit_code: status.code(),
                    stdout,
                    stderr,
                    elapsed: start.elapsed(),
                })
            }
            Ok(Err(e)) => {
                kill_process_group(pid);
                let _ = child.kill().await;
                stdout_task.abort();
                stderr_task.abort();
                Err(HarnessRunError::Wait(e))
            }
            Err(_) => {
                tracing::warn!(
                    pid = ?pid,
                    timeout_secs = self.timeout.as_secs(),
                    "Harness timed out, killing process group"
                );
                kill_process_group(pid);
                let _ = child.kill().await;
                let stdout = collect_stream(stdout_task).await;
                let stderr = collect_stream(stderr_task).await;
                Err(HarnessRunError::TimedOut {
                    after: self.timeout,
                    stdout,
                    stderr,
                })
            }
        }
    }
}

async fn read_stream<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        if let Err(e) = reader.read_to_end(&mut buf).await {
            tracing::debug!(error = %e, "Harness output stream closed with error");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn collect_stream(mut task: JoinHandle<String>) -> String {
    match timeout(OUTPUT_GRACE, &mut task).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "Harness output reader failed");
            String::new()
        }
        Err(_) => {
            task.abort();
            "<output unavailable: stream still held open after harness exit>".to_string()
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        tracing::debug!(pid, error = %e, "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> HarnessCommand {
        HarnessCommand::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let output = sh("echo out; echo err >&2; exit 3").run().await.unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.status_text(), "exit code 3");
    }

    #[tokio::test]
    async fn test_runs_in_working_dir_with_env() {
        let dir = tempfile::tempdir().unwrap();
        let mut command = sh("pwd; echo $PB_TEST_VAR").with_working_dir(dir.path());
        command.env.push(("PB_TEST_VAR".to_string(), "hello".to_string()));

        let output = command.run().await.unwrap();
        assert!(output.success());
        let canonical = dir.path().canonicalize().unwrap();
        assert!(output.stdout.contains(canonical.to_str().unwrap()));
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let started = Instant::now();
        let err = sh("echo begin; exec sleep 30")
            .with_timeout(Duration::from_millis(300))
            .run()
            .await
            .unwrap_err();

        match err {
            HarnessRunError::TimedOut { stdout, .. } => assert!(stdout.contains("begin")),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_timeout_kills_grandchildren() {
        let started = Instant::now();
        let err = sh("sleep 30 & wait")
            .with_timeout(Duration::from_millis(300))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, HarnessRunError::TimedOut { .. }));
        // The backgrounded sleep held stdout; the group kill released it
        assert!(started.elapsed() < OUTPUT_GRACE);
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let err = HarnessCommand::new("/nonexistent/harness-binary", Vec::new())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessRunError::Launch { .. }));
        assert!(err.to_string().contains("/nonexistent/harness-binary"));
    }

    #[test]
    fn test_for_run_appends_run_flags_after_configured_args() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::new("python3", vec!["-m".into(), "swebench".into()])
            .with_prediction_dir(dir.path())
            .with_env("DOCKER_HOST", "tcp://docker:2375");
        let descriptor = crate::runner::RunDescriptorBuilder::from_config(&config)
            .build("psf__requests-2317", "patch")
            .unwrap();

        let command = HarnessCommand::for_run(&config, &descriptor);
        let prediction = descriptor.prediction_path().to_string_lossy().into_owned();
        let expected: Vec<String> = [
            "-m",
            "swebench",
            "--dataset_name",
            "princeton-nlp/SWE-bench",
            "--predictions_path",
            prediction.as_str(),
            "--max_workers",
            "1",
            "--instance_ids",
            "psf__requests-2317",
            "--run_id",
            descriptor.run_id(),
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(command.program, "python3");
        assert_eq!(command.args, expected);
        assert!(
            command
                .env
                .contains(&("DOCKER_HOST".to_string(), "tcp://docker:2375".to_string()))
        );
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let command = HarnessCommand::new("python3", vec!["-m".into(), "a b".into(), "".into()]);
        assert_eq!(command.display(), "python3 -m 'a b' ''");
    }
}
