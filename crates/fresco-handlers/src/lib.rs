//! Fresco Handlers
//!
//! This crate provides the [`StepHandler`] trait, the [`HandlerRegistry`]
//! that resolves fragment types to handlers, and the four built-in handlers:
//! - `data-transform`: reshape JSON with pick/assign/template operations
//! - `api-call`: HTTP requests with templated URLs
//! - `condition`: evaluate a boolean expression against the node input
//! - `loop`: run a transform body a fixed number of times
//!
//! Handlers are pure with respect to orchestration: they receive a
//! [`StepContext`] with merged input and node configuration, and return a
//! JSON value or a [`HandlerError`]. Scheduling, timeouts, and persistence
//! live in the executor.

mod builtin;
mod error;
mod handler;
mod registry;

pub use builtin::{ConditionHandler, HttpHandler, LoopHandler, TransformHandler};
pub use error::HandlerError;
pub use handler::{StepContext, StepHandler};
pub use registry::HandlerRegistry;
