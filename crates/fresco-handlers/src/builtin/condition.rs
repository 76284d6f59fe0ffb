use async_trait::async_trait;
use minijinja::Environment;
use serde_json::Value;

use crate::error::HandlerError;
use crate::handler::{StepContext, StepHandler};

/// Built-in handler for `condition` fragments.
///
/// Evaluates the configured minijinja expression against the node input and
/// outputs the result as a boolean. The executor treats a false output as a
/// guard: downstream nodes are skipped rather than run.
pub struct ConditionHandler;

impl ConditionHandler {
  pub fn new() -> Self {
    Self
  }
}

impl Default for ConditionHandler {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl StepHandler for ConditionHandler {
  fn type_name(&self) -> &str {
    "condition"
  }

  async fn run(&self, ctx: StepContext) -> Result<Value, HandlerError> {
    let expression = ctx
      .config
      .get("expression")
      .and_then(|v| v.as_str())
      .ok_or_else(|| HandlerError::InvalidConfig {
        message: "condition requires an 'expression' string".to_string(),
      })?;

    let env = Environment::new();
    let compiled = env
      .compile_expression(expression)
      .map_err(|e| HandlerError::Template {
        message: format!("invalid expression: {e}"),
      })?;
    let result = compiled
      .eval(minijinja::Value::from_serialize(&ctx.input))
      .map_err(|e| HandlerError::Template {
        message: format!("failed to evaluate expression: {e}"),
      })?;

    Ok(Value::Bool(result.is_true()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use tokio_util::sync::CancellationToken;

  fn ctx(config: Value, input: Value) -> StepContext {
    StepContext {
      execution_id: "exec_1".to_string(),
      node_id: "n1".to_string(),
      input,
      config: config.as_object().cloned().unwrap_or_default(),
      cancel: CancellationToken::new(),
    }
  }

  #[tokio::test]
  async fn test_comparison_expression() {
    let handler = ConditionHandler::new();

    let output = handler
      .run(ctx(json!({"expression": "x > 10"}), json!({"x": 42})))
      .await
      .unwrap();
    assert_eq!(output, json!(true));

    let output = handler
      .run(ctx(json!({"expression": "x > 10"}), json!({"x": 5})))
      .await
      .unwrap();
    assert_eq!(output, json!(false));
  }

  #[tokio::test]
  async fn test_truthiness_of_non_boolean_result() {
    let handler = ConditionHandler::new();

    let output = handler
      .run(ctx(json!({"expression": "name"}), json!({"name": "ada"})))
      .await
      .unwrap();
    assert_eq!(output, json!(true));

    let output = handler
      .run(ctx(json!({"expression": "name"}), json!({"name": ""})))
      .await
      .unwrap();
    assert_eq!(output, json!(false));
  }

  #[tokio::test]
  async fn test_missing_expression_rejected() {
    let handler = ConditionHandler::new();
    let err = handler.run(ctx(json!({}), json!({}))).await.unwrap_err();
    assert!(matches!(err, HandlerError::InvalidConfig { .. }));
  }

  #[tokio::test]
  async fn test_malformed_expression_rejected() {
    let handler = ConditionHandler::new();
    let err = handler
      .run(ctx(json!({"expression": "x >"}), json!({"x": 1})))
      .await
      .unwrap_err();
    assert!(matches!(err, HandlerError::Template { .. }));
  }
}
