// src/exec/completion.rs

use crate::registry::{TaskError, TaskOutput};
use crate::types::{InvocationId, TaskName, Value};

/// Message a worker sends on the completion channel before it exits.
///
/// Failures travel on the same channel as results, so a failing or
/// panicking invocation is always accounted for.
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub invocation: InvocationId,
    pub task_name: TaskName,
    pub args: Vec<Value>,
    pub outcome: Result<TaskOutput, TaskError>,
}

