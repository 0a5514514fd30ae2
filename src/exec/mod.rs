// src/exec/mod.rs

//! Worker pool and completion channel.
//!
//! - [`completion`] defines the record a worker sends back when it exits.
//! - [`pool`] launches one Tokio task per invocation, keeps every handle, and
//!   can abort and join them all.

pub mod completion;
pub mod pool;

pub use completion::CompletionRecord;
pub use pool::WorkerPool;
