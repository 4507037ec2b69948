//! Patch evaluation against an external benchmark harness
//!
//! Each evaluation writes a one-line predictions file, launches the harness
//! as a child process, waits for its result artifact and folds every outcome
//! (including failures) into an [`EvaluationOutcome`].
//!
//! # Example
//!
//! ```rust,ignore
//! use patchbench_core::HarnessConfig;
//! use patchbench_eval::EvalOrchestrator;
//!
//! let orchestrator = EvalOrchestrator::new(HarnessConfig::default());
//! let outcome = orchestrator.evaluate("django__django-11099", patch).await;
//! println!("resolved: {}", outcome.resolved);
//! ```

pub mod outcome;
pub mod prediction;
pub mod runner;

// Re-exports for convenience
pub use outcome::{EvalErrorKind, EvaluationOutcome, EvaluationRequest};
pub use prediction::PredictionRecord;
pub use runner::{EvalOrchestrator, HarnessCommand, RunDescriptor, RunDescriptorBuilder};
