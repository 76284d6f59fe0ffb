use serde::{Deserialize, Serialize};

/// One end of a connection: a port on a named fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
  pub node_id: String,
  pub port_id: String,
}

/// A typed data edge between an output port and an input port.
///
/// Every connection implies a dependency edge from its source node to its
/// target node; validation rejects connections naming unknown nodes or ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
  pub id: String,
  pub source: Endpoint,
  pub target: Endpoint,
  #[serde(default = "default_data_type")]
  pub data_type: String,
}

fn default_data_type() -> String {
  "json".to_string()
}
