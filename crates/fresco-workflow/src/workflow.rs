use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use fresco_config::{FragmentType, WorkflowDef};

use crate::error::ValidationError;
use crate::graph::Graph;
use crate::validate::{dependency_edges, topological_order, validate};

/// A locked workflow ready for execution.
///
/// Locking validates the definition and resolves it into an executable
/// form: fragments keyed by id, the deduplicated dependency edge set, the
/// data bindings carried by connections, and a stable topological order.
/// Executions run against this snapshot, so later edits to the stored
/// definition never affect runs already in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub workflow_id: String,
  pub name: String,
  pub description: Option<String>,
  pub version: u32,
  pub nodes: HashMap<String, FragmentNode>,
  pub edges: Vec<(String, String)>,
  pub bindings: Vec<PortBinding>,
  pub variables: serde_json::Map<String, serde_json::Value>,
  /// Topological order over `nodes`, ties broken by id.
  pub order: Vec<String>,
}

impl Workflow {
  /// Validate and lock a definition.
  pub fn lock(def: &WorkflowDef) -> Result<Self, ValidationError> {
    validate(def)?;
    let order = topological_order(def)?;
    let edges = dependency_edges(def);

    let nodes: HashMap<String, FragmentNode> = def
      .fragments
      .iter()
      .map(|f| {
        (
          f.id.clone(),
          FragmentNode {
            id: f.id.clone(),
            fragment_type: f.fragment_type.clone(),
            name: f.name.clone(),
            config: f.config.clone(),
            timeout_ms: f.timeout_ms,
          },
        )
      })
      .collect();

    let bindings: Vec<PortBinding> = def
      .connections
      .iter()
      .map(|c| PortBinding {
        source_node: c.source.node_id.clone(),
        source_port: c.source.port_id.clone(),
        target_node: c.target.node_id.clone(),
        target_port: c.target.port_id.clone(),
      })
      .collect();

    let variables: serde_json::Map<String, serde_json::Value> = def
      .variables
      .iter()
      .map(|v| (v.name.clone(), v.value.clone()))
      .collect();

    Ok(Self {
      workflow_id: def.id.clone(),
      name: def.name.clone(),
      description: def.description.clone(),
      version: def.version,
      nodes,
      edges,
      bindings,
      variables,
      order,
    })
  }

  /// Build the graph structure for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.nodes, &self.edges)
  }

  /// Get a node by ID.
  pub fn get_node(&self, node_id: &str) -> Option<&FragmentNode> {
    self.nodes.get(node_id)
  }

  /// Bindings that deliver data into `target_node`, in definition order.
  pub fn bindings_for(&self, target_node: &str) -> Vec<&PortBinding> {
    self
      .bindings
      .iter()
      .filter(|b| b.target_node == target_node)
      .collect()
  }
}

/// A fragment resolved for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentNode {
  pub id: String,
  pub fragment_type: FragmentType,
  pub name: String,
  pub config: serde_json::Map<String, serde_json::Value>,
  pub timeout_ms: Option<u64>,
}

/// A resolved connection: data flows from a source port to a target port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortBinding {
  pub source_node: String,
  pub source_port: String,
  pub target_node: String,
  pub target_port: String,
}

#[cfg(test)]
mod tests {
  use super::*;
  use fresco_config::{Connection, Endpoint, FragmentDef, Variable};
  use serde_json::{json, Map};

  fn definition() -> WorkflowDef {
    WorkflowDef {
      id: "wf_1".to_string(),
      name: "enrich".to_string(),
      description: Some("fetch and reshape".to_string()),
      fragments: vec![
        FragmentDef {
          id: "fetch".to_string(),
          fragment_type: FragmentType::ApiCall,
          name: "Fetch".to_string(),
          config: Map::new(),
          depends_on: vec![],
          inputs: vec![],
          outputs: vec![],
          timeout_ms: Some(5_000),
        },
        FragmentDef {
          id: "reshape".to_string(),
          fragment_type: FragmentType::DataTransform,
          name: "Reshape".to_string(),
          config: Map::new(),
          depends_on: vec!["fetch".to_string()],
          inputs: vec![],
          outputs: vec![],
          timeout_ms: None,
        },
      ],
      connections: vec![Connection {
        id: "conn_1".to_string(),
        source: Endpoint {
          node_id: "fetch".to_string(),
          port_id: "output".to_string(),
        },
        target: Endpoint {
          node_id: "reshape".to_string(),
          port_id: "input".to_string(),
        },
        data_type: "json".to_string(),
      }],
      variables: vec![Variable {
        name: "region".to_string(),
        value: json!("us-east"),
        description: None,
      }],
      triggers: vec![],
      version: 3,
    }
  }

  #[test]
  fn test_lock_resolves_definition() {
    let workflow = Workflow::lock(&definition()).unwrap();

    assert_eq!(workflow.workflow_id, "wf_1");
    assert_eq!(workflow.version, 3);
    assert_eq!(workflow.order, ["fetch", "reshape"]);
    assert_eq!(
      workflow.edges,
      [("fetch".to_string(), "reshape".to_string())]
    );
    assert_eq!(workflow.variables.get("region"), Some(&json!("us-east")));

    let node = workflow.get_node("fetch").unwrap();
    assert_eq!(node.fragment_type, FragmentType::ApiCall);
    assert_eq!(node.timeout_ms, Some(5_000));

    let bindings = workflow.bindings_for("reshape");
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].source_node, "fetch");
    assert_eq!(bindings[0].target_port, "input");
  }

  #[test]
  fn test_lock_rejects_invalid_definition() {
    let mut def = definition();
    def.fragments[0].depends_on = vec!["reshape".to_string()];

    let err = Workflow::lock(&def).unwrap_err();
    assert_eq!(err.code(), "CYCLIC_GRAPH");
  }

  #[test]
  fn test_graph_from_locked_workflow() {
    let workflow = Workflow::lock(&definition()).unwrap();
    let graph = workflow.graph();

    assert_eq!(graph.entry_points(), ["fetch".to_string()]);
    assert_eq!(graph.downstream("fetch"), ["reshape".to_string()]);
  }
}
