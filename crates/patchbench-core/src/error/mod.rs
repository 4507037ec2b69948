//! Error types for patchbench
//!
//! This module provides the error type shared by every patchbench crate.
//! All errors implement the `UnifiedError` trait which provides consistent fields:
//! - error_code: A unique identifier for programmatic error handling
//! - message: Human-readable error message
//! - context: Optional additional context about where/why the error occurred

mod constructors;
mod conversions;
mod types;
mod unified_error;

pub use types::{BenchError, BenchResult, UnifiedError};
