// src/registry/mod.rs

//! Task registry.
//!
//! - [`spec`] declares tasks (work, dependencies, callback).
//! - [`work`] defines the unit of work and its input/output types.
//! - [`invocation`] holds pending and scheduled invocation records.
//! - [`store`] is the synchronized registry itself.

pub mod invocation;
pub mod spec;
pub mod store;
pub mod work;

pub use invocation::{PendingInvocation, ScheduledInvocation};
pub use spec::{Callback, Completion, TaskSpec};
pub use store::{Registry, TaskSummary};
pub use work::{TaskError, TaskOutput, TaskWork, WorkFuture, WorkerInput, blocking, from_async};
