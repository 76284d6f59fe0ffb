//! Keyword-driven workflow detection.
//!
//! Scores the latest user message on three signals: workflow vocabulary
//! ("pipeline", "multi-step", ...), sequence markers counted per occurrence
//! ("first", "then", ...), and the number of step clauses that can be
//! extracted from the text. A request only classifies as a workflow when at
//! least two step clauses exist and the combined score clears the threshold,
//! so single-action requests stay near zero.

use async_trait::async_trait;
use fresco_config::FragmentType;
use tracing::debug;

use crate::detector::{ChatMessage, ChatRole, DetectError, Detection, ProposedStep, WorkflowDetector};

const WORKFLOW_THRESHOLD: f32 = 0.5;
const MAX_STEPS: usize = 5;

/// Phrases that signal multi-step intent, matched as substrings.
const WORKFLOW_PHRASES: &[&str] = &[
  "multi-step",
  "pipeline",
  "workflow",
  "step by step",
  "after that",
  "end-to-end",
  "automation",
  "etl",
];

/// Ordering words, matched per token occurrence.
const SEQUENCE_MARKERS: &[&str] = &[
  "first",
  "second",
  "third",
  "then",
  "next",
  "after",
  "afterwards",
  "finally",
  "lastly",
];

const ACTION_WORDS: &[&str] = &[
  "create", "build", "analyze", "process", "generate", "fetch", "scrape", "transform", "display",
  "show", "calculate", "plot", "chart", "clean", "load", "export", "parse", "train", "deploy",
  "send", "convert", "filter", "merge", "download", "upload", "render", "summarize", "extract",
];

const OBJECT_WORDS: &[&str] = &[
  "data", "dataset", "site", "website", "app", "dashboard", "chart", "graph", "api", "report",
  "model", "file", "files", "database", "table", "records", "results", "page", "email", "csv",
  "json",
];

const STOP_WORDS: &[&str] = &[
  "this", "that", "with", "from", "they", "them", "have", "will", "make", "take", "please",
  "could", "would", "should", "about", "there", "their", "these", "those", "using",
];

/// Deterministic detector driven by the scoring rules above.
///
/// Useful as a first-pass filter and in tests; a model-backed detector
/// implementing [`WorkflowDetector`] can replace it without callers
/// changing.
#[derive(Debug, Clone, Default)]
pub struct HeuristicDetector;

impl HeuristicDetector {
  pub fn new() -> Self {
    Self
  }

  fn classify(&self, content: &str) -> Detection {
    let lower = content.to_lowercase();
    let toks = tokens(&lower);
    let clauses = extract_steps(content);

    let confidence = score(&lower, &toks, clauses.len());
    let is_workflow = clauses.len() >= 2 && confidence >= WORKFLOW_THRESHOLD;

    if !is_workflow {
      return Detection {
        is_workflow: false,
        confidence,
        suggested_name: None,
        suggested_description: None,
        reason: "request reads as a single-step task".to_string(),
        steps: vec![],
      };
    }

    let steps = propose_steps(&clauses);
    Detection {
      is_workflow: true,
      confidence,
      suggested_name: Some(suggest_name(&lower)),
      suggested_description: Some(suggest_description(content)),
      reason: format!("detected {} sequential steps in the request", steps.len()),
      steps,
    }
  }
}

#[async_trait]
impl WorkflowDetector for HeuristicDetector {
  async fn detect(&self, history: &[ChatMessage]) -> Result<Detection, DetectError> {
    let Some(message) = history.last().filter(|m| m.role == ChatRole::User) else {
      return Ok(Detection {
        is_workflow: false,
        confidence: 0.0,
        suggested_name: None,
        suggested_description: None,
        reason: "no user request to classify".to_string(),
        steps: vec![],
      });
    };

    let detection = self.classify(&message.content);
    debug!(
      is_workflow = detection.is_workflow,
      confidence = detection.confidence,
      steps = detection.steps.len(),
      "workflow_detection"
    );
    Ok(detection)
  }
}

fn score(lower: &str, toks: &[String], clause_count: usize) -> f32 {
  let phrases = WORKFLOW_PHRASES.iter().filter(|p| lower.contains(*p)).count();
  let markers = toks
    .iter()
    .filter(|t| SEQUENCE_MARKERS.contains(&t.as_str()))
    .count();

  let phrase_score = (phrases as f32 * 0.2).min(0.4);
  let marker_score = (markers as f32 * 0.15).min(0.45);
  let clause_score = if clause_count >= 2 {
    (0.2 + 0.1 * (clause_count as f32 - 2.0)).min(0.4)
  } else {
    0.0
  };

  (phrase_score + marker_score + clause_score).min(1.0)
}

fn tokens(lower: &str) -> Vec<String> {
  lower
    .split(|c: char| !c.is_alphanumeric())
    .filter(|t| !t.is_empty())
    .map(|t| t.to_string())
    .collect()
}

/// Split the request into candidate step clauses, preserving original
/// casing for descriptions. Sentence and comma boundaries both separate
/// clauses; leading ordering words are stripped.
fn extract_steps(content: &str) -> Vec<String> {
  let mut clauses = Vec::new();
  for sentence in content.split(['.', '!', '?', ';', ':', '\n']) {
    for segment in sentence.split(',') {
      for part in segment.split(" then ") {
        let clause = strip_leading_markers(part);
        if clause.split_whitespace().count() >= 2 {
          clauses.push(clause);
          if clauses.len() == MAX_STEPS {
            return clauses;
          }
        }
      }
    }
  }
  clauses
}

fn strip_leading_markers(segment: &str) -> String {
  let mut words: Vec<&str> = segment.split_whitespace().collect();
  while let Some(first) = words.first() {
    let word = first
      .trim_matches(|c: char| !c.is_alphanumeric())
      .to_lowercase();
    if SEQUENCE_MARKERS.contains(&word.as_str()) || word == "and" || word == "that" {
      words.remove(0);
    } else {
      break;
    }
  }
  words.join(" ")
}

fn propose_steps(clauses: &[String]) -> Vec<ProposedStep> {
  let mut steps: Vec<ProposedStep> = Vec::with_capacity(clauses.len());
  for clause in clauses {
    let name = unique_name(step_name(clause), &steps);
    let depends_on = match steps.last() {
      Some(prev) => vec![prev.name.clone()],
      None => vec![],
    };
    steps.push(ProposedStep {
      name,
      description: clause.clone(),
      fragment_type: infer_type(clause),
      depends_on,
    });
  }
  steps
}

/// Disambiguate repeated derived names so dependency references stay
/// unambiguous.
fn unique_name(base: String, steps: &[ProposedStep]) -> String {
  if !steps.iter().any(|s| s.name == base) {
    return base;
  }
  let mut n = 2;
  loop {
    let candidate = format!("{base} ({n})");
    if !steps.iter().any(|s| s.name == candidate) {
      return candidate;
    }
    n += 1;
  }
}

fn step_name(clause: &str) -> String {
  let toks = tokens(&clause.to_lowercase());

  let action_index = toks.iter().position(|t| ACTION_WORDS.contains(&t.as_str()));
  let action = match action_index {
    Some(i) => toks[i].clone(),
    None => toks.first().cloned().unwrap_or_else(|| "step".to_string()),
  };

  let search_from = action_index.map(|i| i + 1).unwrap_or(1);
  let object = toks
    .iter()
    .skip(search_from)
    .find(|t| OBJECT_WORDS.contains(&t.as_str()))
    .or_else(|| {
      toks
        .iter()
        .skip(search_from)
        .find(|t| t.len() > 2 && !STOP_WORDS.contains(&t.as_str()))
    });

  match object {
    Some(object) => format!("{} {}", capitalize(&action), capitalize(object)),
    None => capitalize(&action),
  }
}

fn infer_type(clause: &str) -> FragmentType {
  let toks = tokens(&clause.to_lowercase());
  let has = |words: &[&str]| toks.iter().any(|t| words.contains(&t.as_str()));

  if has(&["check", "verify", "validate", "ensure", "whether", "if", "compare"]) {
    FragmentType::Condition
  } else if has(&["each", "every", "repeat", "iterate", "loop"]) {
    FragmentType::Loop
  } else if has(&[
    "fetch", "scrape", "api", "http", "https", "request", "download", "url", "endpoint",
    "website", "webhook",
  ]) {
    FragmentType::ApiCall
  } else {
    FragmentType::DataTransform
  }
}

fn suggest_name(lower: &str) -> String {
  let keywords: Vec<String> = tokens(lower)
    .into_iter()
    .filter(|t| {
      t.len() > 4 && !SEQUENCE_MARKERS.contains(&t.as_str()) && !STOP_WORDS.contains(&t.as_str())
    })
    .take(3)
    .map(|t| capitalize(&t))
    .collect();

  if keywords.is_empty() {
    "Generated Workflow".to_string()
  } else {
    format!("{} Workflow", keywords.join(" "))
  }
}

fn suggest_description(content: &str) -> String {
  let first_sentence = content
    .split(['.', '!', '?', '\n'])
    .next()
    .unwrap_or(content)
    .trim();
  if first_sentence.chars().count() > 100 {
    let prefix: String = first_sentence.chars().take(97).collect();
    format!("{prefix}...")
  } else {
    first_sentence.to_string()
  }
}

fn capitalize(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    None => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_single_action_is_not_a_workflow() {
    let detector = HeuristicDetector::new();
    let detection = detector
      .detect(&[ChatMessage::user("Fix this bug")])
      .await
      .unwrap();

    assert!(!detection.is_workflow);
    assert!(detection.confidence < WORKFLOW_THRESHOLD);
    assert!(detection.steps.is_empty());
    assert!(detection.suggested_name.is_none());
  }

  #[tokio::test]
  async fn test_sequential_request_is_a_workflow() {
    let detector = HeuristicDetector::new();
    let detection = detector
      .detect(&[ChatMessage::user(
        "First scrape the site, then clean the data, then generate a chart",
      )])
      .await
      .unwrap();

    assert!(detection.is_workflow);
    assert!(detection.confidence >= WORKFLOW_THRESHOLD);
    assert!(detection.confidence <= 1.0);
    assert_eq!(detection.steps.len(), 3);

    // Steps come out in execution order as a chain.
    assert_eq!(detection.steps[0].name, "Scrape Site");
    assert_eq!(detection.steps[0].fragment_type, FragmentType::ApiCall);
    assert!(detection.steps[0].depends_on.is_empty());

    assert_eq!(detection.steps[1].name, "Clean Data");
    assert_eq!(detection.steps[1].fragment_type, FragmentType::DataTransform);
    assert_eq!(detection.steps[1].depends_on, ["Scrape Site"]);

    assert_eq!(detection.steps[2].name, "Generate Chart");
    assert_eq!(detection.steps[2].depends_on, ["Clean Data"]);

    assert_eq!(
      detection.suggested_name.as_deref(),
      Some("Scrape Clean Generate Workflow")
    );
    assert_eq!(
      detection.suggested_description.as_deref(),
      Some("First scrape the site, then clean the data, then generate a chart")
    );
  }

  #[tokio::test]
  async fn test_only_the_last_user_message_counts() {
    let detector = HeuristicDetector::new();

    let detection = detector
      .detect(&[
        ChatMessage::user("First scrape the site, then clean the data, then chart it"),
        ChatMessage::assistant("Done."),
      ])
      .await
      .unwrap();
    assert!(!detection.is_workflow);
    assert_eq!(detection.confidence, 0.0);

    let detection = detector.detect(&[]).await.unwrap();
    assert!(!detection.is_workflow);
  }

  #[tokio::test]
  async fn test_duplicate_step_names_are_disambiguated() {
    let detector = HeuristicDetector::new();
    let detection = detector
      .detect(&[ChatMessage::user(
        "First process the data, then process the data again, finally process the data once more",
      )])
      .await
      .unwrap();

    assert!(detection.is_workflow);
    let names: Vec<&str> = detection.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Process Data", "Process Data (2)", "Process Data (3)"]);
    assert_eq!(detection.steps[2].depends_on, ["Process Data (2)"]);
  }

  #[test]
  fn test_extract_steps_splits_sentences_and_commas() {
    let clauses = extract_steps("Scrape the site. Then clean the data, and chart it");
    assert_eq!(clauses, ["Scrape the site", "clean the data", "chart it"]);
  }

  #[test]
  fn test_extract_steps_caps_at_five() {
    let clauses =
      extract_steps("fetch a, clean b, sort c, merge d, chart e, export f, email g");
    assert_eq!(clauses.len(), 5);
  }

  #[test]
  fn test_strip_leading_markers() {
    assert_eq!(strip_leading_markers(" then clean the data"), "clean the data");
    assert_eq!(strip_leading_markers("After that, send it"), "send it");
    assert_eq!(strip_leading_markers("scrape the site"), "scrape the site");
  }

  #[test]
  fn test_infer_type_priorities() {
    assert_eq!(infer_type("verify the api response"), FragmentType::Condition);
    assert_eq!(infer_type("retry for each record"), FragmentType::Loop);
    assert_eq!(infer_type("fetch the report"), FragmentType::ApiCall);
    assert_eq!(infer_type("reshape the results"), FragmentType::DataTransform);
  }

  #[test]
  fn test_suggest_description_truncates_long_requests() {
    let long = "x".repeat(150);
    let description = suggest_description(&long);
    assert_eq!(description.chars().count(), 100);
    assert!(description.ends_with("..."));
  }
}
