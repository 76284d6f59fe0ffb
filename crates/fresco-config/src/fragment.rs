use std::fmt;

use serde::{Deserialize, Serialize};

/// Input port assumed when a fragment declares no input ports.
pub const DEFAULT_INPUT_PORT: &str = "input";
/// Output port assumed when a fragment declares no output ports.
pub const DEFAULT_OUTPUT_PORT: &str = "output";

/// A single unit of computation in a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentDef {
  pub id: String,
  #[serde(rename = "type")]
  pub fragment_type: FragmentType,
  pub name: String,
  /// Opaque handler configuration, interpreted only by the matching handler.
  #[serde(default)]
  pub config: serde_json::Map<String, serde_json::Value>,
  /// Explicit predecessor ids. The full dependency set is the union of this
  /// list and the edges implied by connections targeting this fragment.
  #[serde(default)]
  pub depends_on: Vec<String>,
  #[serde(default)]
  pub inputs: Vec<Port>,
  #[serde(default)]
  pub outputs: Vec<Port>,
  /// Per-node timeout override in milliseconds.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
}

impl FragmentDef {
  /// Declared input port ids, falling back to the default port.
  pub fn input_ports(&self) -> Vec<&str> {
    if self.inputs.is_empty() {
      vec![DEFAULT_INPUT_PORT]
    } else {
      self.inputs.iter().map(|p| p.id.as_str()).collect()
    }
  }

  /// Declared output port ids, falling back to the default port.
  pub fn output_ports(&self) -> Vec<&str> {
    if self.outputs.is_empty() {
      vec![DEFAULT_OUTPUT_PORT]
    } else {
      self.outputs.iter().map(|p| p.id.as_str()).collect()
    }
  }
}

/// A named input or output slot on a fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data_type: Option<String>,
}

/// The handler a fragment is bound to.
///
/// The four built-in types map to the handlers every registry ships with;
/// any other string is a custom type resolved against handlers registered
/// at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FragmentType {
  DataTransform,
  ApiCall,
  Condition,
  Loop,
  Custom(String),
}

impl FragmentType {
  pub fn as_str(&self) -> &str {
    match self {
      FragmentType::DataTransform => "data-transform",
      FragmentType::ApiCall => "api-call",
      FragmentType::Condition => "condition",
      FragmentType::Loop => "loop",
      FragmentType::Custom(name) => name,
    }
  }
}

impl From<String> for FragmentType {
  fn from(value: String) -> Self {
    match value.as_str() {
      "data-transform" => FragmentType::DataTransform,
      "api-call" => FragmentType::ApiCall,
      "condition" => FragmentType::Condition,
      "loop" => FragmentType::Loop,
      _ => FragmentType::Custom(value),
    }
  }
}

impl From<FragmentType> for String {
  fn from(value: FragmentType) -> Self {
    value.as_str().to_string()
  }
}

impl fmt::Display for FragmentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fragment_type_from_known_strings() {
    assert_eq!(
      FragmentType::from("data-transform".to_string()),
      FragmentType::DataTransform
    );
    assert_eq!(
      FragmentType::from("api-call".to_string()),
      FragmentType::ApiCall
    );
    assert_eq!(
      FragmentType::from("condition".to_string()),
      FragmentType::Condition
    );
    assert_eq!(FragmentType::from("loop".to_string()), FragmentType::Loop);
  }

  #[test]
  fn test_fragment_type_custom_passthrough() {
    let custom = FragmentType::from("sandbox-exec".to_string());
    assert_eq!(custom, FragmentType::Custom("sandbox-exec".to_string()));
    assert_eq!(custom.as_str(), "sandbox-exec");
  }

  #[test]
  fn test_fragment_type_serde_as_string() {
    let json = serde_json::to_string(&FragmentType::DataTransform).unwrap();
    assert_eq!(json, r#""data-transform""#);

    let parsed: FragmentType = serde_json::from_str(r#""loop""#).unwrap();
    assert_eq!(parsed, FragmentType::Loop);
  }

  #[test]
  fn test_default_ports_when_none_declared() {
    let fragment: FragmentDef = serde_json::from_value(serde_json::json!({
      "id": "n1",
      "type": "data-transform",
      "name": "reshape"
    }))
    .unwrap();

    assert_eq!(fragment.input_ports(), vec![DEFAULT_INPUT_PORT]);
    assert_eq!(fragment.output_ports(), vec![DEFAULT_OUTPUT_PORT]);
    assert!(fragment.config.is_empty());
    assert!(fragment.depends_on.is_empty());
  }

  #[test]
  fn test_declared_ports_replace_defaults() {
    let fragment: FragmentDef = serde_json::from_value(serde_json::json!({
      "id": "n1",
      "type": "api-call",
      "name": "fetch",
      "inputs": [{ "id": "request", "data_type": "json" }],
      "outputs": [{ "id": "response" }, { "id": "status" }]
    }))
    .unwrap();

    assert_eq!(fragment.input_ports(), vec!["request"]);
    assert_eq!(fragment.output_ports(), vec!["response", "status"]);
  }
}
