// src/registry/invocation.rs

use std::fmt;
use std::sync::Arc;

use crate::registry::work::TaskWork;
use crate::types::{InvocationId, TaskName, Value};

/// An invocation queued on a task and not yet launched.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInvocation {
    pub id: InvocationId,
    pub args: Vec<Value>,
}

/// An invocation the engine wants the worker pool to start now.
#[derive(Clone)]
pub struct ScheduledInvocation {
    pub id: InvocationId,
    pub task_name: TaskName,
    pub args: Vec<Value>,
    pub(crate) work: Arc<dyn TaskWork>,
}

impl fmt::Debug for ScheduledInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledInvocation")
            .field("id", &self.id)
            .field("task_name", &self.task_name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
