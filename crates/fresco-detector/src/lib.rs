//! Fresco Detector
//!
//! This crate provides the [`WorkflowDetector`] contract for classifying a
//! conversational request as a single task or a multi-step workflow, plus:
//! - [`HeuristicDetector`]: a deterministic, keyword-driven implementation
//! - [`build_definition`]: turns an accepted [`Detection`] into a
//!   `WorkflowDef` ready for validation and storage
//!
//! A detection is advisory. Detectors report a confidence in `[0, 1]` and a
//! proposed decomposition; callers decide their own acceptance threshold and
//! may edit the proposal before building a definition from it. Model-backed
//! detectors live outside this crate and implement the same trait.

mod builder;
mod detector;
mod heuristic;

pub use builder::{BuildError, build_definition};
pub use detector::{
  ChatMessage, ChatRole, DetectError, Detection, ProposedStep, WorkflowDetector,
};
pub use heuristic::HeuristicDetector;
