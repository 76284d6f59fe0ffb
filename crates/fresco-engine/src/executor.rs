//! Workflow executor implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fresco_config::FragmentType;
use fresco_handlers::{HandlerError, HandlerRegistry, StepContext, StepHandler};
use fresco_store::{
  ExecutionCompletion, ExecutionStatus, SkipReason, StepErrorKind, StepResult, StepStatus, Store,
  WorkflowExecution,
};
use fresco_workflow::{FragmentNode, Graph, Workflow};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::ExecuteError;

/// Configuration for the workflow executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
  /// Maximum number of nodes running at once.
  pub max_parallel_nodes: usize,
  /// Timeout applied to nodes that do not set `timeout_ms`.
  pub default_node_timeout: Duration,
  /// Wall-clock budget for a whole execution.
  pub execution_timeout: Duration,
}

impl Default for ExecutorConfig {
  fn default() -> Self {
    Self {
      max_parallel_nodes: 8,
      default_node_timeout: Duration::from_secs(600),
      execution_timeout: Duration::from_secs(1800),
    }
  }
}

/// The workflow executor.
///
/// Drives a locked workflow in waves: each round dispatches every node
/// whose dependencies have settled, waits for the batch, and records the
/// outcomes. Nodes downstream of a failure or a false condition settle as
/// skipped without dispatching.
pub struct WorkflowExecutor {
  registry: Arc<HandlerRegistry>,
  store: Arc<dyn Store>,
  config: ExecutorConfig,
}

enum RunOutcome {
  Finished,
  Cancelled,
  DeadlineExceeded,
}

struct WaveSummary {
  outcome: RunOutcome,
  outputs: serde_json::Map<String, serde_json::Value>,
  failed: Vec<String>,
}

impl WorkflowExecutor {
  /// Create a new workflow executor.
  pub fn new(registry: Arc<HandlerRegistry>, store: Arc<dyn Store>, config: ExecutorConfig) -> Self {
    Self {
      registry,
      store,
      config,
    }
  }

  /// Execute a workflow with the given input payload.
  ///
  /// Creates the execution record, runs the graph to settlement, and seals
  /// the record with its terminal status. The returned record reflects the
  /// stored state, steps included.
  #[instrument(
    name = "workflow_execute",
    skip(self, workflow, input, cancel),
    fields(
      workflow_id = %workflow.workflow_id,
    )
  )]
  pub async fn execute(
    &self,
    workflow: &Workflow,
    input: serde_json::Value,
    cancel: CancellationToken,
  ) -> Result<WorkflowExecution, ExecuteError> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let started = Instant::now();

    info!(
      execution_id = %execution_id,
      workflow_id = %workflow.workflow_id,
      workflow_version = workflow.version,
      "execution_started"
    );

    let record = WorkflowExecution {
      execution_id: execution_id.clone(),
      workflow_id: workflow.workflow_id.clone(),
      workflow_version: workflow.version,
      status: ExecutionStatus::Running,
      input_data: input.clone(),
      output_data: serde_json::Map::new(),
      steps: vec![],
      started_at,
      completed_at: None,
      execution_time_ms: None,
      error_message: None,
    };
    self.store.create_execution(&record).await?;

    let summary = self
      .run_waves(workflow, &input, &execution_id, &cancel)
      .await?;

    let execution_time_ms = started.elapsed().as_millis() as u64;
    let (status, error_message) = match summary.outcome {
      RunOutcome::Cancelled => (
        ExecutionStatus::Cancelled,
        Some("execution cancelled".to_string()),
      ),
      RunOutcome::DeadlineExceeded => (
        ExecutionStatus::Failed,
        Some(format!(
          "execution exceeded the {}s budget",
          self.config.execution_timeout.as_secs()
        )),
      ),
      RunOutcome::Finished if !summary.failed.is_empty() => {
        let mut failed = summary.failed;
        failed.sort_unstable();
        (
          ExecutionStatus::Failed,
          Some(format!(
            "{} node(s) failed: {}",
            failed.len(),
            failed.join(", ")
          )),
        )
      }
      RunOutcome::Finished => (ExecutionStatus::Completed, None),
    };

    match status {
      ExecutionStatus::Completed => {
        info!(
          execution_id = %execution_id,
          duration_ms = execution_time_ms,
          "execution_completed"
        );
      }
      ExecutionStatus::Cancelled => {
        warn!(execution_id = %execution_id, "execution_cancelled");
      }
      _ => {
        let message = error_message.as_deref().unwrap_or("unknown");
        error!(
          execution_id = %execution_id,
          error = %message,
          "execution_failed"
        );
      }
    }

    self
      .store
      .complete_execution(
        &execution_id,
        ExecutionCompletion {
          status,
          output_data: summary.outputs,
          error_message,
          completed_at: Utc::now(),
          execution_time_ms,
        },
      )
      .await?;

    let record = self.store.get_execution(&execution_id).await?;
    Ok(record)
  }

  /// Run the wave loop until every node has settled or the run stops early.
  async fn run_waves(
    &self,
    workflow: &Workflow,
    input: &serde_json::Value,
    execution_id: &str,
    cancel: &CancellationToken,
  ) -> Result<WaveSummary, ExecuteError> {
    let graph = workflow.graph();
    let deadline = Instant::now() + self.config.execution_timeout;
    let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_nodes));

    let mut settled: HashMap<String, StepStatus> = HashMap::new();
    let mut outputs: serde_json::Map<String, serde_json::Value> = serde_json::Map::new();
    let mut failed_guards: HashSet<String> = HashSet::new();
    let mut failed: Vec<String> = Vec::new();

    loop {
      if cancel.is_cancelled() {
        warn!(execution_id = %execution_id, "execution cancelled between waves");
        return Ok(WaveSummary {
          outcome: RunOutcome::Cancelled,
          outputs,
          failed,
        });
      }

      // Settle transitive skips without dispatching anything. Each skip can
      // expose further ready nodes that must be skipped too, so repeat
      // until the frontier is clean.
      loop {
        let frontier = find_ready_nodes(workflow, &graph, &settled);
        let mut skipped_any = false;
        for node_id in &frontier {
          let Some(reason) = skip_reason_for(&graph, node_id, &settled, &failed_guards) else {
            continue;
          };
          info!(
            execution_id = %execution_id,
            node_id = %node_id,
            reason = ?reason,
            "fragment_skipped"
          );
          let step = skipped_step(workflow, node_id, reason);
          self.store.append_step_result(execution_id, &step).await?;
          settled.insert(node_id.clone(), StepStatus::Skipped);
          skipped_any = true;
        }
        if !skipped_any {
          break;
        }
      }

      let frontier = find_ready_nodes(workflow, &graph, &settled);
      if frontier.is_empty() {
        break;
      }

      info!(
        execution_id = %execution_id,
        nodes = ?frontier,
        "wave_dispatched"
      );

      let mut handles = Vec::with_capacity(frontier.len());
      for node_id in &frontier {
        let Some(node) = workflow.get_node(node_id) else {
          continue;
        };
        let node = node.clone();
        let node_input = merge_input(workflow, node_id, input, &outputs);
        let handler = self.registry.resolve(node.fragment_type.as_str());
        let timeout = node
          .timeout_ms
          .map(Duration::from_millis)
          .unwrap_or(self.config.default_node_timeout);

        handles.push(tokio::spawn(run_node(
          handler,
          node,
          node_input,
          execution_id.to_string(),
          timeout,
          semaphore.clone(),
          cancel.clone(),
        )));
      }

      let results = tokio::select! {
        results = futures::future::join_all(handles) => results,
        _ = cancel.cancelled() => {
          warn!(execution_id = %execution_id, "execution cancelled during wave");
          return Ok(WaveSummary {
            outcome: RunOutcome::Cancelled,
            outputs,
            failed,
          });
        }
        _ = tokio::time::sleep_until(deadline) => {
          warn!(execution_id = %execution_id, "execution deadline exceeded");
          return Ok(WaveSummary {
            outcome: RunOutcome::DeadlineExceeded,
            outputs,
            failed,
          });
        }
      };

      let mut wave_cancelled = false;
      for (node_id, joined) in frontier.iter().zip(results) {
        let step = match joined {
          Ok(Some(step)) => step,
          Ok(None) => {
            // The node observed cancellation before producing a result;
            // nothing is recorded for it.
            wave_cancelled = true;
            continue;
          }
          Err(e) => {
            error!(
              execution_id = %execution_id,
              node_id = %node_id,
              error = %e,
              "fragment_failed"
            );
            join_failure_step(workflow, node_id, &e)
          }
        };

        match step.status {
          StepStatus::Completed => {
            info!(
              execution_id = %execution_id,
              node_id = %node_id,
              duration_ms = step.duration_ms,
              "fragment_completed"
            );
            if let Some(output) = &step.result {
              let is_condition = workflow
                .get_node(node_id)
                .is_some_and(|n| n.fragment_type == FragmentType::Condition);
              if is_condition && output == &serde_json::Value::Bool(false) {
                failed_guards.insert(node_id.clone());
              }
              outputs.insert(node_id.clone(), output.clone());
            }
          }
          StepStatus::Failed => {
            let message = step.error.as_deref().unwrap_or("unknown");
            if step.error_kind == Some(StepErrorKind::Timeout) {
              warn!(
                execution_id = %execution_id,
                node_id = %node_id,
                error = %message,
                "fragment_timed_out"
              );
            } else {
              error!(
                execution_id = %execution_id,
                node_id = %node_id,
                error = %message,
                "fragment_failed"
              );
            }
            failed.push(node_id.clone());
          }
          StepStatus::Skipped => {}
        }

        self.store.append_step_result(execution_id, &step).await?;
        settled.insert(node_id.clone(), step.status);
      }

      if wave_cancelled {
        return Ok(WaveSummary {
          outcome: RunOutcome::Cancelled,
          outputs,
          failed,
        });
      }
    }

    Ok(WaveSummary {
      outcome: RunOutcome::Finished,
      outputs,
      failed,
    })
  }
}

/// Run a single node to settlement.
///
/// Returns `None` when the node observed cancellation before producing a
/// result; cancelled nodes leave no step behind.
async fn run_node(
  handler: Option<Arc<dyn StepHandler>>,
  node: FragmentNode,
  input: serde_json::Value,
  execution_id: String,
  timeout: Duration,
  semaphore: Arc<Semaphore>,
  cancel: CancellationToken,
) -> Option<StepResult> {
  let permit = tokio::select! {
    permit = semaphore.acquire_owned() => permit.ok()?,
    _ = cancel.cancelled() => return None,
  };

  let started_at = Utc::now();
  let started = Instant::now();

  info!(
    execution_id = %execution_id,
    node_id = %node.id,
    fragment_type = %node.fragment_type,
    "fragment_started"
  );

  let Some(handler) = handler else {
    drop(permit);
    let completed_at = Utc::now();
    return Some(StepResult {
      node_id: node.id.clone(),
      name: node.name.clone(),
      status: StepStatus::Failed,
      result: None,
      error: Some(format!(
        "no handler registered for type '{}'",
        node.fragment_type
      )),
      error_kind: Some(StepErrorKind::Execution),
      skip_reason: None,
      started_at,
      completed_at,
      duration_ms: started.elapsed().as_millis() as u64,
    });
  };

  let ctx = StepContext {
    execution_id,
    node_id: node.id.clone(),
    input,
    config: node.config.clone(),
    cancel: cancel.clone(),
  };

  let outcome = tokio::time::timeout(timeout, handler.run(ctx)).await;
  drop(permit);

  let completed_at = Utc::now();
  let duration_ms = started.elapsed().as_millis() as u64;

  let step = match outcome {
    Ok(Ok(output)) => StepResult {
      node_id: node.id.clone(),
      name: node.name.clone(),
      status: StepStatus::Completed,
      result: Some(output),
      error: None,
      error_kind: None,
      skip_reason: None,
      started_at,
      completed_at,
      duration_ms,
    },
    Ok(Err(HandlerError::Cancelled)) => return None,
    Ok(Err(e)) => StepResult {
      node_id: node.id.clone(),
      name: node.name.clone(),
      status: StepStatus::Failed,
      result: e.partial_output(),
      error: Some(e.to_string()),
      error_kind: Some(StepErrorKind::Execution),
      skip_reason: None,
      started_at,
      completed_at,
      duration_ms,
    },
    Err(_) => StepResult {
      node_id: node.id.clone(),
      name: node.name.clone(),
      status: StepStatus::Failed,
      result: None,
      error: Some(format!("node timed out after {}ms", timeout.as_millis())),
      error_kind: Some(StepErrorKind::Timeout),
      skip_reason: None,
      started_at,
      completed_at,
      duration_ms,
    },
  };

  Some(step)
}

/// Find nodes that are ready to settle (all upstream nodes settled).
fn find_ready_nodes(
  workflow: &Workflow,
  graph: &Graph,
  settled: &HashMap<String, StepStatus>,
) -> Vec<String> {
  let mut ready: Vec<String> = workflow
    .nodes
    .keys()
    .filter(|id| !settled.contains_key(*id))
    .filter(|id| graph.upstream(id).iter().all(|up| settled.contains_key(up)))
    .cloned()
    .collect();
  ready.sort_unstable();
  ready
}

/// Decide whether a ready node must be skipped instead of dispatched.
///
/// A failed or skipped dependency outweighs a false guard when both apply.
fn skip_reason_for(
  graph: &Graph,
  node_id: &str,
  settled: &HashMap<String, StepStatus>,
  failed_guards: &HashSet<String>,
) -> Option<SkipReason> {
  let upstream = graph.upstream(node_id);
  if upstream.iter().any(|up| {
    matches!(
      settled.get(up),
      Some(StepStatus::Failed) | Some(StepStatus::Skipped)
    )
  }) {
    return Some(SkipReason::UpstreamFailed);
  }
  if upstream.iter().any(|up| failed_guards.contains(up)) {
    return Some(SkipReason::GuardFalse);
  }
  None
}

/// Build the input for a node from variables, the run payload, and settled
/// upstream outputs.
///
/// Precedence, lowest to highest: workflow variables, run payload fields,
/// connection-bound values keyed by target port, then outputs of bare
/// `depends_on` edges keyed by source node id. A connection delivers the
/// source output's port-named field when the output is an object carrying
/// it, and the whole output otherwise.
fn merge_input(
  workflow: &Workflow,
  node_id: &str,
  input: &serde_json::Value,
  outputs: &serde_json::Map<String, serde_json::Value>,
) -> serde_json::Value {
  let mut merged = serde_json::Map::new();

  for (name, value) in &workflow.variables {
    merged.insert(name.clone(), value.clone());
  }

  match input {
    serde_json::Value::Object(map) => {
      for (key, value) in map {
        merged.insert(key.clone(), value.clone());
      }
    }
    serde_json::Value::Null => {}
    other => {
      merged.insert("input".to_string(), other.clone());
    }
  }

  let mut bound_sources: HashSet<&str> = HashSet::new();
  for binding in workflow.bindings_for(node_id) {
    bound_sources.insert(binding.source_node.as_str());
    let Some(output) = outputs.get(&binding.source_node) else {
      continue;
    };
    let value = match output {
      serde_json::Value::Object(map) => map
        .get(&binding.source_port)
        .cloned()
        .unwrap_or_else(|| output.clone()),
      _ => output.clone(),
    };
    merged.insert(binding.target_port.clone(), value);
  }

  for (from, to) in &workflow.edges {
    if to != node_id || bound_sources.contains(from.as_str()) {
      continue;
    }
    if let Some(output) = outputs.get(from) {
      merged.insert(from.clone(), output.clone());
    }
  }

  serde_json::Value::Object(merged)
}

fn skipped_step(workflow: &Workflow, node_id: &str, reason: SkipReason) -> StepResult {
  let now = Utc::now();
  StepResult {
    node_id: node_id.to_string(),
    name: node_name(workflow, node_id),
    status: StepStatus::Skipped,
    result: None,
    error: None,
    error_kind: None,
    skip_reason: Some(reason),
    started_at: now,
    completed_at: now,
    duration_ms: 0,
  }
}

fn join_failure_step(
  workflow: &Workflow,
  node_id: &str,
  error: &tokio::task::JoinError,
) -> StepResult {
  let now = Utc::now();
  StepResult {
    node_id: node_id.to_string(),
    name: node_name(workflow, node_id),
    status: StepStatus::Failed,
    result: None,
    error: Some(format!("task join error: {error}")),
    error_kind: Some(StepErrorKind::Execution),
    skip_reason: None,
    started_at: now,
    completed_at: now,
    duration_ms: 0,
  }
}

fn node_name(workflow: &Workflow, node_id: &str) -> String {
  workflow
    .get_node(node_id)
    .map(|n| n.name.clone())
    .unwrap_or_else(|| node_id.to_string())
}
