//! Fresco Engine
//!
//! This crate provides the [`WorkflowExecutor`] which handles:
//! - Wave-based scheduling: every node whose dependencies have settled runs
//!   in the same batch, bounded by a concurrency limit
//! - Failure containment: a failed node skips its downstream closure while
//!   independent branches keep running
//! - Condition gating: a condition node evaluating to false skips its
//!   downstream nodes without failing the execution
//! - Per-node timeouts, a wall-clock execution budget, and cooperative
//!   cancellation
//!
//! [`WorkflowService`] sits above the executor and ties validation, storage,
//! and execution together into the operations a front end calls.

mod error;
mod executor;
mod service;

pub use error::{ExecuteError, ServiceError};
pub use executor::{ExecutorConfig, WorkflowExecutor};
pub use service::WorkflowService;
