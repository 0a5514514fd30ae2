// src/engine/core.rs

//! Pure engine state machine.
//!
//! [`EngineCore`] consumes completions and produces [`EngineStep`]s listing
//! the invocations that became launchable. It owns the run's [`DagGraph`] and
//! drains the [`Registry`] as tasks become eligible, but it never spawns,
//! awaits or touches the shared state; the async shell does that.
//!
//! Dependency resolution is task-level: the first successful completion of
//! any invocation of a task releases its dependents. Later completions of
//! the same task only update the counters. A task fails only when its last
//! in-flight invocation ends without any of them having succeeded.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::engine::{EngineStep, TaskOutcome, TaskRunState};
use crate::errors::TaskFailure;
use crate::registry::{Registry, ScheduledInvocation};
use crate::types::{InvocationId, TaskId};

#[derive(Debug)]
pub struct EngineCore {
    graph: DagGraph,
    states: HashMap<TaskId, TaskRunState>,
    /// Launched-but-unfinished invocations per task.
    running: HashMap<TaskId, usize>,
    outstanding: usize,
    launched_total: usize,
    completed_total: usize,
    failures: Vec<TaskFailure>,
    blocked: Vec<TaskId>,
}

impl EngineCore {
    pub fn new(graph: DagGraph) -> Self {
        let states = graph.tasks().map(|t| (t, TaskRunState::Waiting)).collect();
        Self {
            graph,
            states,
            running: HashMap::new(),
            outstanding: 0,
            launched_total: 0,
            completed_total: 0,
            failures: Vec::new(),
            blocked: Vec::new(),
        }
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Invocations launched and not yet completed.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn launched_total(&self) -> usize {
        self.launched_total
    }

    pub fn completed_total(&self) -> usize {
        self.completed_total
    }

    pub fn state_of(&self, task: TaskId) -> Option<TaskRunState> {
        self.states.get(&task).copied()
    }

    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    /// Tasks blocked by an upstream failure, in the order they were blocked.
    pub fn blocked(&self) -> &[TaskId] {
        &self.blocked
    }

    /// Tasks with at least one invocation still running, in registration order.
    pub fn running_tasks(&self) -> Vec<TaskId> {
        let mut tasks: Vec<TaskId> = self
            .running
            .iter()
            .filter(|&(_, &n)| n > 0)
            .map(|(&t, _)| t)
            .collect();
        tasks.sort();
        tasks
    }

    /// Tasks still waiting on dependencies.
    pub fn waiting_tasks(&self) -> Vec<TaskId> {
        self.graph
            .tasks()
            .filter(|t| self.states.get(t) == Some(&TaskRunState::Waiting))
            .collect()
    }

    /// Launch every task that has no dependencies.
    pub fn start(&mut self, registry: &Registry) -> EngineStep {
        let mut launched = Vec::new();
        for task in self.graph.eligible() {
            launched.extend(self.launch(task, registry));
        }

        debug!(
            invocations = launched.len(),
            "launched invocations of dependency-free tasks"
        );

        EngineStep {
            launched,
            newly_blocked: Vec::new(),
            run_finished: self.outstanding == 0,
        }
    }

    /// Apply one completion record.
    pub fn step_completion(
        &mut self,
        invocation: InvocationId,
        outcome: TaskOutcome,
        registry: &Registry,
    ) -> EngineStep {
        let task = invocation.task;

        match self.running.get_mut(&task) {
            Some(n) if *n > 0 => *n -= 1,
            _ => {
                warn!(
                    invocation = %invocation,
                    "completion for an invocation that is not running; ignoring"
                );
                return EngineStep {
                    run_finished: self.outstanding == 0,
                    ..EngineStep::default()
                };
            }
        }
        self.outstanding -= 1;

        let mut launched = Vec::new();
        let mut newly_blocked = Vec::new();

        match outcome {
            TaskOutcome::Success => {
                self.completed_total += 1;
                if self.state_of(task) == Some(TaskRunState::Running) {
                    self.states.insert(task, TaskRunState::Completed);
                    debug!(
                        task = %self.graph.name_of(task),
                        invocation = %invocation,
                        "first completion; releasing dependents"
                    );
                    for dependent in self.graph.resolve(task) {
                        if self.state_of(dependent) == Some(TaskRunState::Waiting) {
                            launched.extend(self.launch(dependent, registry));
                        }
                    }
                }
            }
            TaskOutcome::Failed(message) => {
                let name = self.graph.name_of(task).to_string();
                warn!(
                    task = %name,
                    invocation = %invocation,
                    error = %message,
                    "invocation failed"
                );
                self.failures.push(TaskFailure {
                    task: name.clone(),
                    seq: invocation.seq,
                    message,
                });

                let still_running = self.running.get(&task).copied().unwrap_or(0);
                if self.state_of(task) == Some(TaskRunState::Running) && still_running > 0 {
                    debug!(
                        task = %name,
                        still_running,
                        "failure recorded; waiting on sibling invocations"
                    );
                } else if self.state_of(task) == Some(TaskRunState::Running) {
                    self.states.insert(task, TaskRunState::Failed);
                    for dependent in self.graph.transitive_dependents(task) {
                        if self.state_of(dependent) == Some(TaskRunState::Waiting) {
                            self.states.insert(dependent, TaskRunState::Blocked);
                            registry.mark_blocked(dependent);
                            newly_blocked.push(dependent);
                        }
                    }
                    if !newly_blocked.is_empty() {
                        warn!(
                            task = %name,
                            blocked = ?crate::engine::names_of(self, &newly_blocked),
                            "dependents will not run because of the failure"
                        );
                    }
                    self.blocked.extend(newly_blocked.iter().copied());
                }
            }
        }

        EngineStep {
            launched,
            newly_blocked,
            run_finished: self.outstanding == 0,
        }
    }

    fn launch(&mut self, task: TaskId, registry: &Registry) -> Vec<ScheduledInvocation> {
        let batch = registry.launch_batch(task);
        let name = self.graph.name_of(task);

        if batch.is_empty() {
            debug!(task = %name, "task eligible with nothing queued; skipping");
            self.states.insert(task, TaskRunState::Skipped);
            return batch;
        }

        info!(task = %name, invocations = batch.len(), "launching task");
        self.states.insert(task, TaskRunState::Running);
        *self.running.entry(task).or_default() += batch.len();
        self.outstanding += batch.len();
        self.launched_total += batch.len();
        batch
    }
}
