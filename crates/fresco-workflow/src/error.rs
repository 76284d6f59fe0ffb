use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
  /// Two fragments share the same id.
  #[error("duplicate node id '{node_id}'")]
  DuplicateNode { node_id: String },

  /// A dependency or connection references a node that does not exist.
  #[error("unknown node '{node_id}' referenced by {referenced_by}")]
  UnknownNode {
    node_id: String,
    referenced_by: String,
  },

  /// A connection references a port its node does not declare.
  #[error("unknown port '{port_id}' on node '{node_id}' referenced by connection '{connection_id}'")]
  UnknownPort {
    node_id: String,
    port_id: String,
    connection_id: String,
  },

  /// The dependency graph contains a cycle.
  #[error("workflow graph contains a cycle through nodes {nodes:?}")]
  CyclicGraph { nodes: Vec<String> },
}

impl ValidationError {
  /// Stable machine-readable code for surface-level error reporting.
  pub fn code(&self) -> &'static str {
    match self {
      ValidationError::DuplicateNode { .. } => "DUPLICATE_NODE",
      ValidationError::UnknownNode { .. } | ValidationError::UnknownPort { .. } => {
        "UNKNOWN_REFERENCE"
      }
      ValidationError::CyclicGraph { .. } => "CYCLIC_GRAPH",
    }
  }
}
