// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Argument and result values crossing the worker boundary.
pub type Value = serde_json::Value;

/// Human-readable task name, unique within a registry generation.
pub type TaskName = String;

/// Opaque task handle issued by the registry at registration time.
///
/// A `TaskId` is only meaningful for the registry generation that issued it;
/// after `reset()` every previously issued id is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    generation: u64,
    index: u32,
}

impl TaskId {
    pub(crate) fn new(generation: u64, index: u32) -> Self {
        Self { generation, index }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.index)
    }
}

/// One queued call of a task: the task plus its position in enqueue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvocationId {
    pub task: TaskId,
    /// Zero-based enqueue sequence number within the task.
    pub seq: u64,
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.task, self.seq)
    }
}

/// How a declared shared-state field is folded into the master state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// `master + delta` (numbers add, strings and arrays concatenate).
    Add,
    /// The delta value replaces the master value.
    Overwrite,
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(MergeMode::Add),
            "overwrite" => Ok(MergeMode::Overwrite),
            other => Err(format!(
                "invalid merge mode: {other} (expected \"add\" or \"overwrite\")"
            )),
        }
    }
}

/// What to do with a delta field that has no declared [`MergeMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UndeclaredFieldPolicy {
    #[default]
    Overwrite,
    Add,
    /// Undeclared fields are a merge error.
    Reject,
}

impl FromStr for UndeclaredFieldPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(UndeclaredFieldPolicy::Overwrite),
            "add" => Ok(UndeclaredFieldPolicy::Add),
            "reject" => Ok(UndeclaredFieldPolicy::Reject),
            other => Err(format!(
                "invalid undeclared field policy: {other} (expected \"overwrite\", \"add\" or \"reject\")"
            )),
        }
    }
}
