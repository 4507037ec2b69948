//! Post-exit poll for the result artifact
//!
//! The harness may create or finish flushing its result file shortly after
//! the process exits. The poll checks immediately, then backs off
//! exponentially until the file reads cleanly or the configured total wait
//! is spent.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use patchbench_core::config::SettleConfig;
use tokio::time::Instant;

/// Smallest sleep between checks, so a zero initial delay cannot spin
const MIN_STEP: Duration = Duration::from_millis(1);

/// Exponential delay schedule without jitter
#[derive(Debug, Clone)]
pub struct SettleBackoff {
    config: SettleConfig,
    attempt: u32,
}

impl SettleBackoff {
    pub fn new(config: SettleConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay for the given attempt number (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.config.initial_delay.as_secs_f64()
            * self.config.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let capped = base.min(self.config.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Next delay, advancing the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for_attempt(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }
}

/// Result of a settle poll
#[derive(Debug)]
pub enum Settled<T, E> {
    /// The file was read successfully
    Ready(T),
    /// The file existed but the last read within the budget failed
    Invalid(E),
    /// The file never appeared
    Missing,
}

/// Polls for a file and reads it, retrying within a bounded time
#[derive(Debug, Clone)]
pub struct ArtifactPoller {
    config: SettleConfig,
}

impl ArtifactPoller {
    pub fn new(config: SettleConfig) -> Self {
        Self { config }
    }

    /// Poll `path` until `read` succeeds or `max_wait` is spent
    ///
    /// A failed read is retried on the same schedule, so a file that is
    /// still being flushed when it first appears is read again later.
    pub async fn settle<T, E, F, Fut>(&self, path: &Path, mut read: F) -> Settled<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start = Instant::now();
        let mut backoff = SettleBackoff::new(self.config.clone());
        let mut checks = 0u32;
        let mut last_error = None;

        loop {
            checks += 1;
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                match read().await {
                    Ok(value) => {
                        if checks > 1 {
                            tracing::debug!(
                                path = %path.display(),
                                checks,
                                waited_ms = start.elapsed().as_millis() as u64,
                                "Result artifact settled"
                            );
                        }
                        return Settled::Ready(value);
                    }
                    Err(e) => {
                        tracing::debug!(
                            path = %path.display(),
                            checks,
                            error = %e,
                            "Result artifact not readable yet"
                        );
                        last_error = Some(e);
                    }
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= self.config.max_wait {
                tracing::debug!(path = %path.display(), checks, "Settle budget spent");
                return match last_error {
                    Some(e) => Settled::Invalid(e),
                    None => Settled::Missing,
                };
            }

            let remaining = self.config.max_wait - elapsed;
            let step = backoff.next_delay().max(MIN_STEP).min(remaining);
            tokio::time::sleep(step).await;
        }
    }
}
