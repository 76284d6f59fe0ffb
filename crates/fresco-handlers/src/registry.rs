use std::collections::HashMap;
use std::sync::Arc;

use crate::builtin::{ConditionHandler, HttpHandler, LoopHandler, TransformHandler};
use crate::handler::StepHandler;

/// Registry of available step handlers, keyed by fragment type.
pub struct HandlerRegistry {
  handlers: HashMap<String, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
  pub fn new() -> Self {
    Self {
      handlers: HashMap::new(),
    }
  }

  /// Register a handler. Replaces any handler already serving the type.
  pub fn register(&mut self, handler: impl StepHandler) {
    let type_name = handler.type_name().to_string();
    self.handlers.insert(type_name, Arc::new(handler));
  }

  /// Resolve the handler for a fragment type.
  pub fn resolve(&self, type_name: &str) -> Option<Arc<dyn StepHandler>> {
    self.handlers.get(type_name).cloned()
  }

  /// List registered fragment types, sorted.
  pub fn list(&self) -> Vec<&str> {
    let mut types: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
    types.sort_unstable();
    types
  }

  /// Create a registry with the built-in handlers registered.
  pub fn with_builtins(client: reqwest::Client) -> Self {
    let mut registry = Self::new();
    registry.register(TransformHandler::new());
    registry.register(HttpHandler::new(client));
    registry.register(ConditionHandler::new());
    registry.register(LoopHandler::new());
    registry
  }
}

impl Default for HandlerRegistry {
  fn default() -> Self {
    Self::new()
  }
}
