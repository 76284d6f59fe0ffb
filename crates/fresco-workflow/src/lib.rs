//! Fresco Workflow
//!
//! This crate provides the validated, "locked" workflow representation for
//! Fresco. A locked workflow is the frozen form of a definition that an
//! execution runs against.
//!
//! Key differences from `fresco-config`:
//! - Graph structure is validated (unique ids, known references, acyclic)
//! - Fragments live in an id-keyed arena instead of an ordered list
//! - Dependency edges (declared and connection-implied) are materialized
//! - A topological order is captured for scheduling and auditing
//!
//! Validation is synchronous and side-effect free; it runs on every
//! definition create or update before anything is persisted.

mod error;
mod graph;
mod validate;
mod workflow;

pub use error::ValidationError;
pub use graph::Graph;
pub use validate::validate;
pub use workflow::{FragmentNode, PortBinding, Workflow};
