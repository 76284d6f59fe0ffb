//! Fresco Config
//!
//! This crate contains the serializable workflow definition types for Fresco.
//! These types represent workflow definitions before they are validated and
//! locked by the engine.
//!
//! Definitions can be loaded from:
//! - JSON files (via the CLI)
//! - Storage backends (as JSON blobs)
//!
//! The engine takes these definition types, validates the dependency graph,
//! and locks them into runtime structures for execution. Handler configuration
//! is carried as an opaque map and interpreted only by the matching handler.

mod connection;
mod fragment;
mod trigger;
mod workflow;

pub use connection::{Connection, Endpoint};
pub use fragment::{DEFAULT_INPUT_PORT, DEFAULT_OUTPUT_PORT, FragmentDef, FragmentType, Port};
pub use trigger::{TriggerDef, TriggerType};
pub use workflow::{Variable, WorkflowDef};
