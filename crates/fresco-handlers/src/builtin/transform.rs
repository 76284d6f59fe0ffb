//! Data reshaping via pick/assign/template operations.
//!
//! The transform spec is applied in a fixed order:
//! 1. `pick`: keep only the listed top-level fields
//! 2. `assign`: set fields to literal values
//! 3. `template`: set fields from minijinja templates rendered against the
//!    original (pre-pick) input
//!
//! An empty spec is the identity transform and passes the input through
//! unchanged, whatever its shape. A non-object input with operations to
//! apply is first wrapped as `{"input": value}`.

use std::collections::HashMap;

use async_trait::async_trait;
use minijinja::Environment;
use serde::Deserialize;
use serde_json::Value;

use crate::error::HandlerError;
use crate::handler::{StepContext, StepHandler};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformSpec {
  #[serde(default)]
  pub pick: Option<Vec<String>>,
  #[serde(default)]
  pub assign: serde_json::Map<String, Value>,
  #[serde(default)]
  pub template: HashMap<String, String>,
}

impl TransformSpec {
  fn is_identity(&self) -> bool {
    self.pick.is_none() && self.assign.is_empty() && self.template.is_empty()
  }
}

/// Apply a transform spec to an input value.
pub fn apply(spec: &TransformSpec, input: &Value) -> Result<Value, HandlerError> {
  if spec.is_identity() {
    return Ok(input.clone());
  }

  let mut result = match input {
    Value::Object(map) => map.clone(),
    other => {
      let mut map = serde_json::Map::new();
      map.insert("input".to_string(), other.clone());
      map
    }
  };

  if let Some(fields) = &spec.pick {
    result.retain(|key, _| fields.iter().any(|f| f == key));
  }

  for (key, value) in &spec.assign {
    result.insert(key.clone(), value.clone());
  }

  if !spec.template.is_empty() {
    let env = Environment::new();
    let context = minijinja::Value::from_serialize(input);
    for (key, template) in &spec.template {
      let rendered =
        env
          .render_str(template, context.clone())
          .map_err(|e| HandlerError::Template {
            message: format!("failed to render '{key}': {e}"),
          })?;
      result.insert(key.clone(), Value::String(rendered));
    }
  }

  Ok(Value::Object(result))
}

/// Built-in handler for `data-transform` fragments.
pub struct TransformHandler;

impl TransformHandler {
  pub fn new() -> Self {
    Self
  }
}

impl Default for TransformHandler {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl StepHandler for TransformHandler {
  fn type_name(&self) -> &str {
    "data-transform"
  }

  async fn run(&self, ctx: StepContext) -> Result<Value, HandlerError> {
    let spec: TransformSpec =
      serde_json::from_value(Value::Object(ctx.config)).map_err(|e| HandlerError::InvalidConfig {
        message: e.to_string(),
      })?;
    apply(&spec, &ctx.input)
  }
}
