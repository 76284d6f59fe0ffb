use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fresco_config::WorkflowDef;
use fresco_detector::{ChatMessage, HeuristicDetector, WorkflowDetector, build_definition};
use fresco_engine::{ExecutorConfig, WorkflowExecutor, WorkflowService};
use fresco_handlers::HandlerRegistry;
use fresco_store::{ExecutionStatus, MemoryStore};
use fresco_workflow::validate;

/// Fresco - a workflow engine for dependency-graph workflows
#[derive(Parser)]
#[command(name = "fresco")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Validate a workflow definition file
  Validate {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Execute a workflow from a definition file
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Input payload as a JSON string (default: read from stdin)
    #[arg(long)]
    input: Option<String>,

    /// Maximum number of nodes running at once
    #[arg(long)]
    max_parallel: Option<usize>,

    /// Wall-clock budget for the whole execution, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
  },

  /// Classify a chat message and optionally build a workflow draft from it
  Detect {
    /// The user message to classify
    message: String,

    /// Print a workflow definition draft instead of the detection
    #[arg(long)]
    build: bool,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_target(false)
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Validate { workflow_file }) => validate_workflow(workflow_file),
    Some(Commands::Run {
      workflow_file,
      input,
      max_parallel,
      timeout_secs,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_workflow(workflow_file, input, max_parallel, timeout_secs))
    }
    Some(Commands::Detect { message, build }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(detect_workflow(message, build))
    }
    None => {
      println!("fresco - use --help to see available commands");
      Ok(())
    }
  }
}

fn validate_workflow(workflow_file: PathBuf) -> Result<()> {
  let def = load_definition(&workflow_file)?;

  match validate(&def) {
    Ok(()) => {
      eprintln!(
        "Workflow '{}' is valid: {} nodes, {} connections",
        def.name,
        def.fragments.len(),
        def.connections.len()
      );
      Ok(())
    }
    Err(e) => {
      eprintln!("Workflow '{}' is invalid: [{}] {}", def.name, e.code(), e);
      std::process::exit(1);
    }
  }
}

async fn run_workflow(
  workflow_file: PathBuf,
  input: Option<String>,
  max_parallel: Option<usize>,
  timeout_secs: Option<u64>,
) -> Result<()> {
  let def = load_definition(&workflow_file)?;
  eprintln!("Loaded workflow: {}", def.name);

  let payload = match input {
    Some(raw) => serde_json::from_str(&raw).context("failed to parse --input JSON")?,
    None => read_payload_from_stdin()?,
  };

  let mut config = ExecutorConfig::default();
  if let Some(n) = max_parallel {
    config.max_parallel_nodes = n;
  }
  if let Some(secs) = timeout_secs {
    config.execution_timeout = Duration::from_secs(secs);
  }

  let store = Arc::new(MemoryStore::new());
  let registry = Arc::new(HandlerRegistry::with_builtins(reqwest::Client::new()));
  let executor = WorkflowExecutor::new(registry, store.clone(), config);
  let service = WorkflowService::new(store, executor);

  let stored = service
    .create_workflow(&def)
    .await
    .context("failed to register workflow")?;

  let cancel = CancellationToken::new();
  let ctrl_c = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      eprintln!("Cancelling execution...");
      ctrl_c.cancel();
    }
  });

  let execution = service
    .start_execution(&stored.id, payload, cancel)
    .await
    .context("workflow execution failed")?;

  eprintln!(
    "Execution {} finished: {:?} ({} steps)",
    execution.execution_id,
    execution.status,
    execution.steps.len()
  );
  println!("{}", serde_json::to_string_pretty(&execution)?);

  match execution.status {
    ExecutionStatus::Completed => Ok(()),
    ExecutionStatus::Cancelled => std::process::exit(130),
    _ => std::process::exit(1),
  }
}

async fn detect_workflow(message: String, build: bool) -> Result<()> {
  let detector = HeuristicDetector::new();
  let detection = detector
    .detect(&[ChatMessage::user(message)])
    .await
    .context("detection failed")?;

  eprintln!(
    "Detection: workflow={} confidence={:.2} steps={}",
    detection.is_workflow,
    detection.confidence,
    detection.steps.len()
  );

  if !build {
    println!("{}", serde_json::to_string_pretty(&detection)?);
    return Ok(());
  }

  if !detection.is_workflow {
    eprintln!("Message did not classify as a workflow; nothing to build");
    std::process::exit(1);
  }

  let def = build_definition(&detection).context("failed to build workflow definition")?;
  println!("{}", serde_json::to_string_pretty(&def)?);
  Ok(())
}

fn load_definition(path: &Path) -> Result<WorkflowDef> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read workflow file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", path.display()))
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(serde_json::json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read payload from stdin")?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
    }
  }
}
