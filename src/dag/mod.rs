// src/dag/mod.rs

//! Dependency graph.
//!
//! - [`graph`] holds the per-run `depends_on` / `needed_for` bookkeeping.
//! - [`validate`] rejects cyclic and unresolvable graphs before anything is
//!   launched.

pub mod graph;
pub(crate) mod validate;

pub use graph::DagGraph;
