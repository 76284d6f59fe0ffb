//! Error types for workflow execution.

use thiserror::Error;

/// Errors that abort an execution outright.
///
/// Node-level failures never surface here: they settle into step results
/// and the record's terminal status. Only storage failures stop the engine
/// from driving a run.
#[derive(Debug, Error)]
pub enum ExecuteError {
  #[error(transparent)]
  Store(#[from] fresco_store::Error),
}

/// Errors returned by the service surface.
#[derive(Debug, Error)]
pub enum ServiceError {
  /// The workflow definition failed validation.
  #[error("validation failed: {0}")]
  Validation(#[from] fresco_workflow::ValidationError),

  /// A storage operation failed.
  #[error(transparent)]
  Store(#[from] fresco_store::Error),

  /// The executor could not drive the run.
  #[error(transparent)]
  Execute(#[from] ExecuteError),
}
