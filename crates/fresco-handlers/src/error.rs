use thiserror::Error;

/// Errors a handler can return from [`crate::StepHandler::run`].
#[derive(Debug, Error)]
pub enum HandlerError {
  /// The node's configuration is missing or malformed.
  #[error("invalid config: {message}")]
  InvalidConfig { message: String },

  /// A template or expression failed to render.
  #[error("template error: {message}")]
  Template { message: String },

  /// HTTP request failed.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The handler observed cancellation and stopped.
  #[error("cancelled")]
  Cancelled,

  /// A loop iteration failed after earlier iterations completed.
  #[error("loop iteration {iteration} failed: {message}")]
  LoopIteration {
    iteration: u64,
    message: String,
    completed: Vec<serde_json::Value>,
  },
}

impl HandlerError {
  /// Output salvaged before the failure, if any.
  ///
  /// A failed loop reports the iterations that did complete; the executor
  /// records this on the failed step so the work is not lost.
  pub fn partial_output(&self) -> Option<serde_json::Value> {
    match self {
      HandlerError::LoopIteration { completed, .. } if !completed.is_empty() => {
        Some(serde_json::Value::Array(completed.clone()))
      }
      _ => None,
    }
  }
}
