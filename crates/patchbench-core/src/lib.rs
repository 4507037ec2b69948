//! Core library for patchbench
//!
//! Shared building blocks for the evaluation service:
//!
//! - **error**: the `BenchError` type used across crates
//! - **config**: layered configuration (defaults, file, environment, overrides)
//! - **catalog**: the read-only task catalog and its startup handle

pub mod catalog;
pub mod config;
pub mod error;

pub use catalog::{CatalogHandle, LocalTaskCatalog, TaskCatalog, TaskRecord};
pub use config::{AppConfig, ConfigLoader, HarnessConfig, SettleConfig};
pub use error::{BenchError, BenchResult, UnifiedError};
