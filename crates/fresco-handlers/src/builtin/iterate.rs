use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::builtin::transform::{self, TransformSpec};
use crate::error::HandlerError;
use crate::handler::{StepContext, StepHandler};

/// Configuration schema for `loop` fragments.
#[derive(Debug, Deserialize)]
struct LoopConfig {
  /// Number of iterations to run. Required, must be at least 1.
  iterations: u64,
  /// Transform applied each iteration. Defaults to the identity, which
  /// echoes the iteration scope.
  #[serde(default)]
  body: TransformSpec,
}

/// Built-in handler for `loop` fragments.
///
/// Runs the body transform `iterations` times and outputs the collected
/// results as an array. Each iteration sees a scope object:
/// `{"index": n, "input": <node input>, "prev": <previous result or null>}`.
///
/// On a mid-loop failure the error carries the iterations that already
/// completed, so the executor can record partial output on the failed step.
pub struct LoopHandler;

impl LoopHandler {
  pub fn new() -> Self {
    Self
  }
}

impl Default for LoopHandler {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl StepHandler for LoopHandler {
  fn type_name(&self) -> &str {
    "loop"
  }

  async fn run(&self, ctx: StepContext) -> Result<Value, HandlerError> {
    let config: LoopConfig =
      serde_json::from_value(Value::Object(ctx.config)).map_err(|e| HandlerError::InvalidConfig {
        message: e.to_string(),
      })?;
    if config.iterations == 0 {
      return Err(HandlerError::InvalidConfig {
        message: "loop requires at least one iteration".to_string(),
      });
    }

    let mut completed: Vec<Value> = Vec::with_capacity(config.iterations as usize);
    for index in 0..config.iterations {
      if ctx.cancel.is_cancelled() {
        return Err(HandlerError::Cancelled);
      }

      let scope = serde_json::json!({
        "index": index,
        "input": ctx.input,
        "prev": completed.last().cloned().unwrap_or(Value::Null),
      });

      match transform::apply(&config.body, &scope) {
        Ok(value) => completed.push(value),
        Err(e) => {
          return Err(HandlerError::LoopIteration {
            iteration: index,
            message: e.to_string(),
            completed,
          });
        }
      }
    }

    Ok(Value::Array(completed))
  }
}
