use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
  Pending,
  Running,
  Completed,
  Failed,
  Cancelled,
}

impl ExecutionStatus {
  /// Whether the execution has reached a terminal state.
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
    )
  }
}

/// Status of a single settled step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Completed,
  Failed,
  Skipped,
}

/// Why a skipped step was never dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  /// An upstream dependency failed or was itself skipped.
  UpstreamFailed,
  /// An upstream condition node evaluated to false.
  GuardFalse,
}

/// What kind of failure a failed step carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
  /// The handler returned an error.
  Execution,
  /// The node exceeded its timeout.
  Timeout,
}

/// The settled outcome of one node in an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
  pub node_id: String,
  pub name: String,
  pub status: StepStatus,
  /// Handler output for completed steps; partial output for failures that
  /// salvaged some work (loop iterations completed before the failure).
  pub result: Option<serde_json::Value>,
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_kind: Option<StepErrorKind>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub skip_reason: Option<SkipReason>,
  pub started_at: DateTime<Utc>,
  pub completed_at: DateTime<Utc>,
  pub duration_ms: u64,
}

/// A workflow execution record.
///
/// Created when a run starts and appended to as nodes settle. The record
/// captures the workflow version it ran against, so later definition edits
/// never change what a finished record describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
  pub execution_id: String,
  pub workflow_id: String,
  pub workflow_version: u32,
  pub status: ExecutionStatus,
  pub input_data: serde_json::Value,
  /// Outputs of completed nodes, keyed by node id.
  #[serde(default)]
  pub output_data: serde_json::Map<String, serde_json::Value>,
  #[serde(default)]
  pub steps: Vec<StepResult>,
  pub started_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
  pub execution_time_ms: Option<u64>,
  pub error_message: Option<String>,
}

/// The terminal outcome applied when sealing an execution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionCompletion {
  pub status: ExecutionStatus,
  pub output_data: serde_json::Map<String, serde_json::Value>,
  pub error_message: Option<String>,
  pub completed_at: DateTime<Utc>,
  pub execution_time_ms: u64,
}
