//! Fresco Store
//!
//! This crate provides the storage trait and implementations for workflow
//! definitions and execution records.
//!
//! The [`Store`] trait defines operations for:
//! - Persisting workflow definitions with optimistic concurrency on `version`
//! - Creating execution records and appending step results as nodes settle
//! - Querying execution history
//!
//! Execution records are append-only: steps are added as they finish and the
//! record is sealed once with [`Store::complete_execution`]. Deleting a
//! workflow never deletes its executions.

mod memory;
mod types;

pub use memory::MemoryStore;
pub use types::{
  ExecutionCompletion, ExecutionStatus, SkipReason, StepErrorKind, StepResult, StepStatus,
  WorkflowExecution,
};

use async_trait::async_trait;
use fresco_config::WorkflowDef;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A record with the same id already exists.
  #[error("already exists: {0}")]
  AlreadyExists(String),

  /// A concurrent update won the race for this workflow version.
  #[error("workflow version conflict: expected {expected}, got {actual}")]
  VersionConflict { expected: u32, actual: u32 },
}

/// Storage trait for workflow definitions and execution records.
#[async_trait]
pub trait Store: Send + Sync {
  /// Persist a new workflow definition.
  async fn create_workflow(&self, def: &WorkflowDef) -> Result<(), Error>;

  /// Get a workflow definition by ID.
  async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowDef, Error>;

  /// Replace a workflow definition.
  ///
  /// `def.version` must match the stored version; on success the stored
  /// definition carries the returned (incremented) version.
  async fn update_workflow(&self, def: &WorkflowDef) -> Result<u32, Error>;

  /// Delete a workflow definition. Execution history is retained.
  async fn delete_workflow(&self, workflow_id: &str) -> Result<(), Error>;

  /// List all workflow definitions, ordered by id.
  async fn list_workflows(&self) -> Result<Vec<WorkflowDef>, Error>;

  /// Create a new execution record.
  async fn create_execution(&self, execution: &WorkflowExecution) -> Result<(), Error>;

  /// Get an execution record by ID.
  async fn get_execution(&self, execution_id: &str) -> Result<WorkflowExecution, Error>;

  /// List executions for a workflow, ordered by start time.
  async fn list_executions(&self, workflow_id: &str) -> Result<Vec<WorkflowExecution>, Error>;

  /// Append a settled step to an execution record.
  async fn append_step_result(&self, execution_id: &str, step: &StepResult) -> Result<(), Error>;

  /// Seal an execution record with its terminal status and outputs.
  async fn complete_execution(
    &self,
    execution_id: &str,
    completion: ExecutionCompletion,
  ) -> Result<(), Error>;
}
