//! Core error types and traits for patchbench

use thiserror::Error;

/// Result type alias for patchbench operations
pub type BenchResult<T> = Result<T, BenchError>;

/// Unified error trait that all patchbench errors implement.
///
/// - error_code(): Unique code for programmatic error identification
/// - message(): Human-readable error message
/// - context(): Optional additional context
pub trait UnifiedError: std::error::Error + Send + Sync {
    /// Get the error code for programmatic handling
    fn error_code(&self) -> &str;

    /// Get the human-readable error message
    fn message(&self) -> &str;

    /// Get optional context about the error
    fn context(&self) -> Option<&str> {
        None
    }

    /// Check if retrying the same operation could succeed
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Main error type for patchbench
#[derive(Error, Debug, Clone)]
pub enum BenchError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// IO errors (transient files, log directories, dataset files)
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
        context: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        context: Option<String>,
    },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
        context: Option<String>,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        resource_type: Option<String>,
        context: Option<String>,
    },

    /// The task catalog was never loaded
    #[error("Task catalog unavailable: {reason}")]
    CatalogUnavailable { reason: String },

    /// Harness execution timeout
    #[error("Harness execution timeout after {seconds} seconds")]
    Timeout {
        seconds: u64,
        context: Option<String>,
    },

    /// External harness invocation errors
    #[error("Harness error: {message}")]
    Harness {
        message: String,
        context: Option<String>,
    },

    /// Generic error with context
    #[error("Error: {message}")]
    Other {
        message: String,
        context: Option<String>,
    },
}
