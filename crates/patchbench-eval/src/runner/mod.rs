//! Evaluation runner components
//!
//! This module provides the machinery behind one harness run: the run
//! descriptor, the process supervisor, the artifact settle poll and the
//! orchestrator tying them together.

mod artifact;
mod descriptor;
mod diagnostics;
mod harness;
mod orchestrator;
mod settle;

pub use artifact::{ArtifactError, read_result_artifact};
pub use descriptor::{RunDescriptor, RunDescriptorBuilder, validate_task_id};
pub use diagnostics::truncate_tail;
pub use harness::{HarnessCommand, HarnessOutput, HarnessRunError};
pub use orchestrator::EvalOrchestrator;
pub use settle::{ArtifactPoller, SettleBackoff, Settled};
