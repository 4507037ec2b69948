//! Centralized default values
//!
//! Every default used by the configuration model lives here so the CLI help,
//! the documentation and the serde defaults agree.

use std::time::Duration;

/// Default values for the harness invocation
pub mod harness {
    use super::*;

    /// Interpreter used to launch the harness
    pub const PROGRAM: &str = "python3";

    /// Arguments placed before the orchestrator's own flags
    pub const ARGS: &[&str] = &["-m", "swebench.harness.run_evaluation"];

    /// Dataset the harness evaluates against
    pub const DATASET_NAME: &str = "princeton-nlp/SWE-bench";

    /// Tag written into every prediction record
    pub const MODEL_NAME: &str = "api-client";

    /// Prefix of every run identifier
    pub const RUN_ID_PREFIX: &str = "api-evaluation";

    /// Result artifact file name, relative to the result directory
    pub const RESULT_FILE_TEMPLATE: &str = "{run_id}.json";

    /// Directory receiving harness diagnostics
    pub const LOGS_DIR: &str = "./logs/run_evaluation";

    /// Runtime socket handed to the harness for sandboxed execution
    pub const DOCKER_HOST: &str = "unix:///var/run/docker.sock";

    /// Hard limit for a single harness run (30 minutes)
    pub const TIMEOUT_SECS: u64 = 1800;

    /// Characters of each output stream quoted in an error message
    pub const MAX_OUTPUT_CHARS: usize = 16 * 1024;

    /// Get the harness timeout as Duration
    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}

/// Default values for the post-exit artifact poll
pub mod settle {
    use super::*;

    /// First delay between artifact checks (100 milliseconds)
    pub const INITIAL_DELAY_MS: u64 = 100;

    /// Upper bound for a single delay (1 second)
    pub const MAX_DELAY_MS: u64 = 1000;

    /// Total time spent waiting for the artifact (5 seconds)
    pub const MAX_WAIT_MS: u64 = 5000;

    /// Growth factor between consecutive delays
    pub const MULTIPLIER: f64 = 2.0;

    pub fn initial_delay() -> Duration {
        Duration::from_millis(INITIAL_DELAY_MS)
    }

    pub fn max_delay() -> Duration {
        Duration::from_millis(MAX_DELAY_MS)
    }

    pub fn max_wait() -> Duration {
        Duration::from_millis(MAX_WAIT_MS)
    }
}

/// Default values for the HTTP server
pub mod server {
    pub const HOST: &str = "127.0.0.1";
    pub const PORT: u16 = 8000;

    /// Number of harness runs a batch request drives at once
    pub const BATCH_CONCURRENCY: usize = 1;
}

/// Name of the configuration file looked up when none is given
pub const CONFIG_FILE: &str = "patchbench.toml";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "PATCHBENCH";
