// src/engine/mod.rs

//! Execution engine.
//!
//! The pure state machine lives in [`core`]: it decides which invocations to
//! launch when a run starts and after each completion, and propagates
//! failures to dependents. It performs no IO and can be stepped by hand.
//!
//! The async shell in [`runtime`] owns the worker pool and the completion
//! channel, merges shared state, fires callbacks, enforces the run deadline
//! and drains every worker before returning.

use std::collections::HashMap;
use std::time::Duration;

use crate::registry::ScheduledInvocation;
use crate::state::SharedState;
use crate::types::{TaskId, TaskName, Value};

pub mod core;
pub mod runtime;

pub use self::core::EngineCore;
pub use runtime::Runtime;

/// Outcome of one invocation as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(String),
}

/// Per-task state within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// Some dependency has not completed yet.
    Waiting,
    /// Launched; no invocation has completed yet.
    Running,
    /// At least one invocation completed and dependents were released.
    /// Other invocations of the task may still be running.
    Completed,
    /// An invocation failed before any succeeded; dependents are blocked.
    Failed,
    /// Will not run in this run because an upstream task failed.
    Blocked,
    /// Became eligible with nothing queued.
    Skipped,
}

impl TaskRunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskRunState::Completed
                | TaskRunState::Failed
                | TaskRunState::Blocked
                | TaskRunState::Skipped
        )
    }
}

/// Structured result of a single core step.
#[derive(Debug, Clone, Default)]
pub struct EngineStep {
    /// Invocations to hand to the worker pool now.
    pub launched: Vec<ScheduledInvocation>,
    /// Tasks newly marked [`TaskRunState::Blocked`] by this step.
    pub newly_blocked: Vec<TaskId>,
    /// Whether no invocation is outstanding after this step.
    pub run_finished: bool,
}

/// What a finished run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub run_id: u64,
    /// Successful results per task, in enqueue order.
    pub results: HashMap<TaskId, Vec<Value>>,
    /// Master shared state after the last merge.
    pub shared_state: SharedState,
    /// Number of invocations launched.
    pub launched: usize,
    /// Number of invocations that completed successfully.
    pub completed: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn results_of(&self, task: TaskId) -> &[Value] {
        self.results.get(&task).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Task names for diagnostics; kept here so both halves of the engine agree.
pub(crate) fn names_of(core: &EngineCore, tasks: &[TaskId]) -> Vec<TaskName> {
    tasks
        .iter()
        .map(|&t| core.graph().name_of(t).to_string())
        .collect()
}
