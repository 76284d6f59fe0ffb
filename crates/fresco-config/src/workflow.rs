use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::fragment::FragmentDef;
use crate::trigger::TriggerDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub fragments: Vec<FragmentDef>,
  #[serde(default)]
  pub connections: Vec<Connection>,
  #[serde(default)]
  pub variables: Vec<Variable>,
  #[serde(default)]
  pub triggers: Vec<TriggerDef>,
  /// Bumped on every accepted mutation; used for optimistic concurrency.
  #[serde(default = "default_version")]
  pub version: u32,
}

fn default_version() -> u32 {
  1
}

/// A named value seeded into the global input context of every execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
  pub name: String,
  pub value: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}
