use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerError;

/// Context provided to a handler for one node invocation.
#[derive(Debug, Clone)]
pub struct StepContext {
  /// Workflow execution ID.
  pub execution_id: String,

  /// Node ID within the workflow.
  pub node_id: String,

  /// Merged input: workflow variables, trigger payload, and upstream
  /// outputs keyed by target port.
  pub input: serde_json::Value,

  /// The node's handler configuration, passed through opaquely.
  pub config: serde_json::Map<String, serde_json::Value>,

  /// Cooperative cancellation. Long-running handlers should return
  /// [`HandlerError::Cancelled`] promptly once this fires.
  pub cancel: CancellationToken,
}

/// A handler executes one kind of fragment.
///
/// Implementations must be safe to call concurrently; the executor invokes
/// a single registered instance from many tasks at once.
#[async_trait]
pub trait StepHandler: Send + Sync + 'static {
  /// The fragment type string this handler serves.
  fn type_name(&self) -> &str;

  /// Execute one node and produce its output.
  async fn run(&self, ctx: StepContext) -> Result<serde_json::Value, HandlerError>;
}
