use std::collections::HashMap;

use async_trait::async_trait;
use fresco_config::WorkflowDef;
use tokio::sync::RwLock;

use crate::types::{ExecutionCompletion, StepResult, WorkflowExecution};
use crate::{Error, Store};

/// In-memory store backed by `RwLock<HashMap>`.
///
/// Suitable for tests and single-process deployments. All operations clone
/// on the way in and out, so callers never observe partial writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
  workflows: RwLock<HashMap<String, WorkflowDef>>,
  executions: RwLock<HashMap<String, WorkflowExecution>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn create_workflow(&self, def: &WorkflowDef) -> Result<(), Error> {
    let mut workflows = self.workflows.write().await;
    if workflows.contains_key(&def.id) {
      return Err(Error::AlreadyExists(format!("workflow '{}'", def.id)));
    }
    workflows.insert(def.id.clone(), def.clone());
    Ok(())
  }

  async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowDef, Error> {
    let workflows = self.workflows.read().await;
    workflows
      .get(workflow_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(format!("workflow '{workflow_id}'")))
  }

  async fn update_workflow(&self, def: &WorkflowDef) -> Result<u32, Error> {
    let mut workflows = self.workflows.write().await;
    let current = workflows
      .get(&def.id)
      .ok_or_else(|| Error::NotFound(format!("workflow '{}'", def.id)))?;

    if current.version != def.version {
      return Err(Error::VersionConflict {
        expected: def.version,
        actual: current.version,
      });
    }

    let mut next = def.clone();
    next.version = def.version + 1;
    let version = next.version;
    workflows.insert(def.id.clone(), next);
    Ok(version)
  }

  async fn delete_workflow(&self, workflow_id: &str) -> Result<(), Error> {
    let mut workflows = self.workflows.write().await;
    workflows
      .remove(workflow_id)
      .map(|_| ())
      .ok_or_else(|| Error::NotFound(format!("workflow '{workflow_id}'")))
  }

  async fn list_workflows(&self) -> Result<Vec<WorkflowDef>, Error> {
    let workflows = self.workflows.read().await;
    let mut all: Vec<WorkflowDef> = workflows.values().cloned().collect();
    all.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(all)
  }

  async fn create_execution(&self, execution: &WorkflowExecution) -> Result<(), Error> {
    let mut executions = self.executions.write().await;
    if executions.contains_key(&execution.execution_id) {
      return Err(Error::AlreadyExists(format!(
        "execution '{}'",
        execution.execution_id
      )));
    }
    executions.insert(execution.execution_id.clone(), execution.clone());
    Ok(())
  }

  async fn get_execution(&self, execution_id: &str) -> Result<WorkflowExecution, Error> {
    let executions = self.executions.read().await;
    executions
      .get(execution_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(format!("execution '{execution_id}'")))
  }

  async fn list_executions(&self, workflow_id: &str) -> Result<Vec<WorkflowExecution>, Error> {
    let executions = self.executions.read().await;
    let mut matching: Vec<WorkflowExecution> = executions
      .values()
      .filter(|e| e.workflow_id == workflow_id)
      .cloned()
      .collect();
    matching.sort_by_key(|e| e.started_at);
    Ok(matching)
  }

  async fn append_step_result(&self, execution_id: &str, step: &StepResult) -> Result<(), Error> {
    let mut executions = self.executions.write().await;
    let execution = executions
      .get_mut(execution_id)
      .ok_or_else(|| Error::NotFound(format!("execution '{execution_id}'")))?;
    execution.steps.push(step.clone());
    Ok(())
  }

  async fn complete_execution(
    &self,
    execution_id: &str,
    completion: ExecutionCompletion,
  ) -> Result<(), Error> {
    let mut executions = self.executions.write().await;
    let execution = executions
      .get_mut(execution_id)
      .ok_or_else(|| Error::NotFound(format!("execution '{execution_id}'")))?;
    execution.status = completion.status;
    execution.output_data = completion.output_data;
    execution.error_message = completion.error_message;
    execution.completed_at = Some(completion.completed_at);
    execution.execution_time_ms = Some(completion.execution_time_ms);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{ExecutionStatus, StepStatus};
  use chrono::Utc;
  use serde_json::json;

  fn definition(id: &str) -> WorkflowDef {
    WorkflowDef {
      id: id.to_string(),
      name: "test".to_string(),
      description: None,
      fragments: vec![],
      connections: vec![],
      variables: vec![],
      triggers: vec![],
      version: 1,
    }
  }

  fn execution(id: &str, workflow_id: &str) -> WorkflowExecution {
    WorkflowExecution {
      execution_id: id.to_string(),
      workflow_id: workflow_id.to_string(),
      workflow_version: 1,
      status: ExecutionStatus::Running,
      input_data: json!({}),
      output_data: serde_json::Map::new(),
      steps: vec![],
      started_at: Utc::now(),
      completed_at: None,
      execution_time_ms: None,
      error_message: None,
    }
  }

  fn step(node_id: &str) -> StepResult {
    let now = Utc::now();
    StepResult {
      node_id: node_id.to_string(),
      name: node_id.to_string(),
      status: StepStatus::Completed,
      result: Some(json!({"ok": true})),
      error: None,
      error_kind: None,
      skip_reason: None,
      started_at: now,
      completed_at: now,
      duration_ms: 0,
    }
  }

  #[tokio::test]
  async fn test_workflow_crud_round_trip() {
    let store = MemoryStore::new();

    store.create_workflow(&definition("wf_1")).await.unwrap();
    store.create_workflow(&definition("wf_2")).await.unwrap();

    let fetched = store.get_workflow("wf_1").await.unwrap();
    assert_eq!(fetched.id, "wf_1");
    assert_eq!(fetched.version, 1);

    let all = store.list_workflows().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, "wf_1");

    store.delete_workflow("wf_1").await.unwrap();
    assert!(matches!(
      store.get_workflow("wf_1").await,
      Err(Error::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn test_create_duplicate_workflow_rejected() {
    let store = MemoryStore::new();
    store.create_workflow(&definition("wf_1")).await.unwrap();

    assert!(matches!(
      store.create_workflow(&definition("wf_1")).await,
      Err(Error::AlreadyExists(_))
    ));
  }

  #[tokio::test]
  async fn test_update_increments_version_and_rejects_stale_writers() {
    let store = MemoryStore::new();
    store.create_workflow(&definition("wf_1")).await.unwrap();

    let mut def = definition("wf_1");
    def.name = "renamed".to_string();
    let version = store.update_workflow(&def).await.unwrap();
    assert_eq!(version, 2);

    let stored = store.get_workflow("wf_1").await.unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.name, "renamed");

    // A second writer still holding version 1 loses the race.
    let err = store.update_workflow(&def).await.unwrap_err();
    assert!(matches!(
      err,
      Error::VersionConflict {
        expected: 1,
        actual: 2
      }
    ));
  }

  #[tokio::test]
  async fn test_execution_lifecycle() {
    let store = MemoryStore::new();
    store
      .create_execution(&execution("exec_1", "wf_1"))
      .await
      .unwrap();

    store.append_step_result("exec_1", &step("a")).await.unwrap();
    store.append_step_result("exec_1", &step("b")).await.unwrap();

    let mut output_data = serde_json::Map::new();
    output_data.insert("b".to_string(), json!({"ok": true}));
    store
      .complete_execution(
        "exec_1",
        ExecutionCompletion {
          status: ExecutionStatus::Completed,
          output_data,
          error_message: None,
          completed_at: Utc::now(),
          execution_time_ms: 12,
        },
      )
      .await
      .unwrap();

    let record = store.get_execution("exec_1").await.unwrap();
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.steps.len(), 2);
    assert_eq!(record.steps[0].node_id, "a");
    assert_eq!(record.execution_time_ms, Some(12));
    assert!(record.output_data.contains_key("b"));
  }

  #[tokio::test]
  async fn test_delete_workflow_keeps_executions() {
    let store = MemoryStore::new();
    store.create_workflow(&definition("wf_1")).await.unwrap();
    store
      .create_execution(&execution("exec_1", "wf_1"))
      .await
      .unwrap();

    store.delete_workflow("wf_1").await.unwrap();

    let history = store.list_executions("wf_1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].execution_id, "exec_1");
  }

  #[tokio::test]
  async fn test_append_to_unknown_execution_fails() {
    let store = MemoryStore::new();
    assert!(matches!(
      store.append_step_result("missing", &step("a")).await,
      Err(Error::NotFound(_))
    ));
  }
}
