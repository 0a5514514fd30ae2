// src/errors.rs

//! Crate-wide error type and `Result` alias.

use std::time::Duration;

use thiserror::Error;

use crate::engine::RunReport;
use crate::state::MergeError;
use crate::types::TaskName;

/// A single invocation that reported a failure instead of a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: TaskName,
    /// Enqueue sequence number of the failed invocation.
    pub seq: u64,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum SemisyncError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        task: TaskName,
        dependency: TaskName,
    },

    #[error("cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error(
        "task '{dependency}' has no queued invocations, so its dependents can never run: {stranded:?}"
    )]
    UnresolvableDependency {
        dependency: TaskName,
        stranded: Vec<TaskName>,
    },

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task '{0}' was already launched in the active run; a new invocation would never run")]
    TaskAlreadyLaunched(TaskName),

    #[error("task '{0}' is blocked by a failed dependency in the active run")]
    TaskBlocked(TaskName),

    #[error("a run is already in progress")]
    RunInProgress,

    #[error("{} invocation(s) failed; {} dependent task(s) never ran", failures.len(), blocked.len())]
    RunFailed {
        failures: Vec<TaskFailure>,
        blocked: Vec<TaskName>,
        partial: Box<RunReport>,
    },

    #[error("run timed out after {after:?}; still outstanding: {outstanding:?}")]
    Timeout {
        after: Duration,
        outstanding: Vec<TaskName>,
    },

    #[error("shared-state merge failed for task '{task}': {source}")]
    Merge {
        task: TaskName,
        #[source]
        source: MergeError,
    },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("toml parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SemisyncError>;
