//! UnifiedError trait implementation for BenchError

use super::types::{BenchError, UnifiedError};

impl UnifiedError for BenchError {
    fn error_code(&self) -> &str {
        match self {
            Self::Config { .. } => "BENCH_CONFIG",
            Self::Io { .. } => "BENCH_IO",
            Self::Json { .. } => "BENCH_JSON",
            Self::InvalidInput { .. } => "BENCH_INVALID_INPUT",
            Self::NotFound { .. } => "BENCH_NOT_FOUND",
            Self::CatalogUnavailable { .. } => "BENCH_CATALOG_UNAVAILABLE",
            Self::Timeout { .. } => "BENCH_TIMEOUT",
            Self::Harness { .. } => "BENCH_HARNESS",
            Self::Other { .. } => "BENCH_OTHER",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Config { message, .. } => message,
            Self::Io { message, .. } => message,
            Self::Json { message, .. } => message,
            Self::InvalidInput { message, .. } => message,
            Self::NotFound { message, .. } => message,
            Self::CatalogUnavailable { reason } => reason,
            Self::Timeout { .. } => "Harness execution timeout",
            Self::Harness { message, .. } => message,
            Self::Other { message, .. } => message,
        }
    }

    fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. } => context.as_deref(),
            Self::Io { context, .. } => context.as_deref(),
            Self::Json { context, .. } => context.as_deref(),
            Self::InvalidInput { context, .. } => context.as_deref(),
            Self::NotFound { context, .. } => context.as_deref(),
            Self::CatalogUnavailable { .. } => None,
            Self::Timeout { context, .. } => context.as_deref(),
            Self::Harness { context, .. } => context.as_deref(),
            Self::Other { context, .. } => context.as_deref(),
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io { .. })
    }
}
