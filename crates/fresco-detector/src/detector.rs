use async_trait::async_trait;
use fresco_config::FragmentType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One message of the conversation a detector classifies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role: ChatRole,
  pub content: String,
}

impl ChatMessage {
  pub fn user(content: impl Into<String>) -> Self {
    Self {
      role: ChatRole::User,
      content: content.into(),
    }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self {
      role: ChatRole::Assistant,
      content: content.into(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
  User,
  Assistant,
  System,
}

/// The advisory outcome of classifying a conversation.
///
/// `confidence` is always in `[0, 1]`. No cutoff is baked in here: a caller
/// that wants high precision picks a high threshold, a caller that prefers
/// to surface suggestions picks a low one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub is_workflow: bool,
  pub confidence: f32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub suggested_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub suggested_description: Option<String>,
  pub reason: String,
  /// Proposed decomposition, in execution order. Empty when
  /// `is_workflow` is false.
  #[serde(default)]
  pub steps: Vec<ProposedStep>,
}

/// One proposed step of a detected workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedStep {
  pub name: String,
  pub description: String,
  #[serde(rename = "type")]
  pub fragment_type: FragmentType,
  /// Names of earlier steps this one needs. When no step in a detection
  /// declares dependencies, the builder falls back to a linear chain.
  #[serde(default)]
  pub depends_on: Vec<String>,
}

/// Errors a detector backend can report.
///
/// The heuristic implementation never fails; model-backed implementations
/// wrap transport and decoding failures here.
#[derive(Debug, Error)]
pub enum DetectError {
  #[error("detection backend failed: {message}")]
  Backend { message: String },
}

/// Classifies a conversation as a single task or a multi-step workflow.
///
/// Implementations are non-deterministic oracles as far as callers are
/// concerned: the output is a suggestion to build a definition from, never
/// ground truth.
#[async_trait]
pub trait WorkflowDetector: Send + Sync {
  async fn detect(&self, history: &[ChatMessage]) -> Result<Detection, DetectError>;
}
