//! Service surface tying validation, storage, and execution together.

use std::sync::Arc;

use fresco_config::WorkflowDef;
use fresco_store::{Store, WorkflowExecution};
use fresco_workflow::{Workflow, validate};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::ServiceError;
use crate::executor::WorkflowExecutor;

/// The operations a definition-management or execution-trigger caller uses.
///
/// Every definition write validates first: an invalid definition is rejected
/// before anything reaches the store. Executions run against a locked
/// snapshot of the definition, so edits made while a run is in flight never
/// change what that run computes.
pub struct WorkflowService {
  store: Arc<dyn Store>,
  executor: WorkflowExecutor,
}

impl WorkflowService {
  pub fn new(store: Arc<dyn Store>, executor: WorkflowExecutor) -> Self {
    Self { store, executor }
  }

  /// Validate and persist a new workflow definition.
  ///
  /// The stored definition always starts at version 1, whatever the caller
  /// supplied. Returns the definition as stored.
  pub async fn create_workflow(&self, def: &WorkflowDef) -> Result<WorkflowDef, ServiceError> {
    validate(def)?;

    let mut def = def.clone();
    def.version = 1;
    self.store.create_workflow(&def).await?;

    info!(workflow_id = %def.id, name = %def.name, "workflow_created");
    Ok(def)
  }

  /// Validate and persist an update to an existing definition.
  ///
  /// `def.version` is the version the caller read; a concurrent writer that
  /// got there first surfaces as a version conflict from the store. Returns
  /// the new stored version.
  pub async fn update_workflow(&self, def: &WorkflowDef) -> Result<u32, ServiceError> {
    validate(def)?;

    let version = self.store.update_workflow(def).await?;
    info!(workflow_id = %def.id, version, "workflow_updated");
    Ok(version)
  }

  pub async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowDef, ServiceError> {
    Ok(self.store.get_workflow(workflow_id).await?)
  }

  pub async fn list_workflows(&self) -> Result<Vec<WorkflowDef>, ServiceError> {
    Ok(self.store.list_workflows().await?)
  }

  /// Delete a definition. Its execution history stays readable.
  pub async fn delete_workflow(&self, workflow_id: &str) -> Result<(), ServiceError> {
    self.store.delete_workflow(workflow_id).await?;
    info!(workflow_id = %workflow_id, "workflow_deleted");
    Ok(())
  }

  /// Start an execution of a stored workflow and drive it to its terminal
  /// state.
  ///
  /// The definition is loaded and locked once, up front; the returned record
  /// carries every step result. Node failures do not surface as an `Err`,
  /// only infrastructure faults do.
  pub async fn start_execution(
    &self,
    workflow_id: &str,
    input: serde_json::Value,
    cancel: CancellationToken,
  ) -> Result<WorkflowExecution, ServiceError> {
    let def = self.store.get_workflow(workflow_id).await?;
    let workflow = Workflow::lock(&def)?;
    let record = self.executor.execute(&workflow, input, cancel).await?;
    Ok(record)
  }

  /// Run an already-locked workflow snapshot without touching the
  /// definition store.
  pub async fn execute_snapshot(
    &self,
    workflow: &Workflow,
    input: serde_json::Value,
    cancel: CancellationToken,
  ) -> Result<WorkflowExecution, ServiceError> {
    Ok(self.executor.execute(workflow, input, cancel).await?)
  }

  pub async fn get_execution(&self, execution_id: &str) -> Result<WorkflowExecution, ServiceError> {
    Ok(self.store.get_execution(execution_id).await?)
  }

  pub async fn list_executions(
    &self,
    workflow_id: &str,
  ) -> Result<Vec<WorkflowExecution>, ServiceError> {
    Ok(self.store.list_executions(workflow_id).await?)
  }
}
