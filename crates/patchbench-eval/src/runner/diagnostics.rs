//! Per-run diagnostics: output truncation and the run log file

use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Utc;

/// Keep the last `max_chars` characters of `text`, marking what was cut
pub fn truncate_tail(text: &str, max_chars: usize) -> Cow<'_, str> {
    let total = text.chars().count();
    if total <= max_chars {
        return Cow::Borrowed(text);
    }

    let skipped = total - max_chars;
    let start = text
        .char_indices()
        .nth(skipped)
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    Cow::Owned(format!(
        "[... {} characters truncated ...]{}",
        skipped,
        &text[start..]
    ))
}

/// Everything recorded about one harness run
#[derive(Debug)]
pub struct RunLog<'a> {
    pub run_id: &'a str,
    pub task_id: &'a str,
    pub command: &'a str,
    pub status: &'a str,
    pub elapsed_ms: u128,
    pub stdout: &'a str,
    pub stderr: &'a str,
}

impl RunLog<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "recorded_at: {}", Utc::now().to_rfc3339());
        let _ = writeln!(out, "run_id: {}", self.run_id);
        let _ = writeln!(out, "task_id: {}", self.task_id);
        let _ = writeln!(out, "command: {}", self.command);
        let _ = writeln!(out, "status: {}", self.status);
        let _ = writeln!(out, "elapsed_ms: {}", self.elapsed_ms);
        let _ = writeln!(out, "--- stdout ---");
        out.push_str(self.stdout);
        if !self.stdout.ends_with('\n') {
            out.push('\n');
        }
        let _ = writeln!(out, "--- stderr ---");
        out.push_str(self.stderr);
        if !self.stderr.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    /// Write `<logs_dir>/<run_id>.log`, logging instead of failing
    pub async fn persist(&self, logs_dir: &Path) -> Option<PathBuf> {
        let path = logs_dir.join(format!("{}.log", self.run_id));
        match tokio::fs::write(&path, self.render()).await {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(
                    run_id = %self.run_id,
                    path = %path.display(),
                    error = %e,
                    "Failed to write harness log"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_tail() {
        assert_eq!(truncate_tail("short", 10), "short");
        assert_eq!(truncate_tail("abcdef", 3), "[... 3 characters truncated ...]def");
        // multibyte characters are never split
        assert_eq!(truncate_tail("ééééé", 2), "[... 3 characters truncated ...]éé");
        assert_eq!(truncate_tail("abc", 0), "[... 3 characters truncated ...]");
    }

    #[tokio::test]
    async fn test_persist_writes_run_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog {
            run_id: "api-evaluation-t-1",
            task_id: "t",
            command: "python3 -m harness",
            status: "exit code 0",
            elapsed_ms: 12,
            stdout: "out",
            stderr: "",
        };

        let path = log.persist(dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("api-evaluation-t-1.log"));

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("command: python3 -m harness"));
        assert!(content.contains("--- stdout ---\nout\n"));
    }

    #[tokio::test]
    async fn test_persist_failure_is_not_fatal() {
        let log = RunLog {
            run_id: "r",
            task_id: "t",
            command: "c",
            status: "s",
            elapsed_ms: 0,
            stdout: "",
            stderr: "",
        };
        assert!(log.persist(Path::new("/nonexistent/logs")).await.is_none());
    }
}
