//! Turns a positive detection into a workflow definition draft.
//!
//! The draft wires proposed steps into fragments and connections with
//! default ports, a manual trigger, and empty handler configuration. It is
//! structurally valid and ready to persist, but a user still has to fill in
//! handler configuration before the workflow does useful work.

use std::collections::HashMap;

use fresco_config::{
  Connection, DEFAULT_INPUT_PORT, DEFAULT_OUTPUT_PORT, Endpoint, FragmentDef, TriggerDef,
  TriggerType, WorkflowDef,
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::detector::Detection;

const FALLBACK_NAME: &str = "AI Generated Workflow";
const FALLBACK_DESCRIPTION: &str = "Workflow generated from chat conversation";

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("detection has no steps to build a workflow from")]
  NoSteps,
  #[error("step '{step}' depends on '{dependency}', which is not an earlier step")]
  UnknownDependency { step: String, dependency: String },
}

/// Builds a draft [`WorkflowDef`] from a detection.
///
/// Steps become fragments `node_1..node_N` in the order proposed. Declared
/// dependencies are resolved against earlier step names only, so the result
/// is acyclic by construction; when no step declares a dependency the steps
/// are chained linearly instead. Every dependency edge also becomes a
/// connection on the default ports so step outputs flow downstream.
pub fn build_definition(detection: &Detection) -> Result<WorkflowDef, BuildError> {
  if detection.steps.is_empty() {
    return Err(BuildError::NoSteps);
  }

  let chain_linearly = detection.steps.iter().all(|s| s.depends_on.is_empty());

  let mut node_ids: HashMap<&str, String> = HashMap::new();
  let mut fragments = Vec::with_capacity(detection.steps.len());
  let mut edges: Vec<(String, String)> = Vec::new();

  for (index, step) in detection.steps.iter().enumerate() {
    let node_id = format!("node_{}", index + 1);

    let mut depends_on = Vec::new();
    if chain_linearly {
      if index > 0 {
        depends_on.push(format!("node_{index}"));
      }
    } else {
      for dependency in &step.depends_on {
        let Some(source) = node_ids.get(dependency.as_str()) else {
          return Err(BuildError::UnknownDependency {
            step: step.name.clone(),
            dependency: dependency.clone(),
          });
        };
        depends_on.push(source.clone());
      }
    }

    for source in &depends_on {
      edges.push((source.clone(), node_id.clone()));
    }

    fragments.push(FragmentDef {
      id: node_id.clone(),
      fragment_type: step.fragment_type.clone(),
      name: step.name.clone(),
      config: serde_json::Map::new(),
      depends_on,
      inputs: vec![],
      outputs: vec![],
      timeout_ms: None,
    });
    node_ids.insert(step.name.as_str(), node_id);
  }

  let connections = edges
    .iter()
    .enumerate()
    .map(|(index, (source, target))| Connection {
      id: format!("conn_{}", index + 1),
      source: Endpoint {
        node_id: source.clone(),
        port_id: DEFAULT_OUTPUT_PORT.to_string(),
      },
      target: Endpoint {
        node_id: target.clone(),
        port_id: DEFAULT_INPUT_PORT.to_string(),
      },
      data_type: "json".to_string(),
    })
    .collect::<Vec<_>>();

  let def = WorkflowDef {
    id: Uuid::new_v4().to_string(),
    name: detection
      .suggested_name
      .clone()
      .unwrap_or_else(|| FALLBACK_NAME.to_string()),
    description: Some(
      detection
        .suggested_description
        .clone()
        .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string()),
    ),
    fragments,
    connections,
    variables: vec![],
    triggers: vec![TriggerDef {
      id: "trigger_1".to_string(),
      trigger_type: TriggerType::Manual,
      config: serde_json::Map::new(),
    }],
    version: 1,
  };

  info!(
    workflow_id = %def.id,
    nodes = def.fragments.len(),
    connections = def.connections.len(),
    "workflow_draft_built"
  );
  Ok(def)
}
