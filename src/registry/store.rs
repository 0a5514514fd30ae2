// src/registry/store.rs

//! The task registry: declarations plus per-task pending invocation queues.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::errors::{Result, SemisyncError};
use crate::registry::invocation::{PendingInvocation, ScheduledInvocation};
use crate::registry::spec::{Callback, TaskSpec};
use crate::registry::work::TaskWork;
use crate::types::{InvocationId, TaskId, TaskName, Value};

/// Where a task stands in the active run, as far as submission is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum RunMark {
    #[default]
    NotLaunched,
    Launched,
    Blocked,
}

struct TaskEntry {
    id: TaskId,
    name: TaskName,
    work: Arc<dyn TaskWork>,
    /// Declared once at first registration.
    dependencies: Vec<TaskName>,
    callback: Option<Callback>,
    pending: VecDeque<PendingInvocation>,
    next_seq: u64,
    run_mark: RunMark,
}

#[derive(Default)]
struct RegistryState {
    generation: u64,
    tasks: Vec<TaskEntry>,
    by_name: HashMap<TaskName, TaskId>,
    run_active: bool,
}

impl RegistryState {
    fn entry(&self, id: TaskId) -> Result<&TaskEntry> {
        if id.generation() != self.generation {
            return Err(SemisyncError::TaskNotFound(format!(
                "{id} belongs to a registry generation that was reset"
            )));
        }
        self.tasks
            .get(id.index())
            .ok_or_else(|| SemisyncError::TaskNotFound(id.to_string()))
    }

    fn entry_mut(&mut self, id: TaskId) -> Result<&mut TaskEntry> {
        if id.generation() != self.generation {
            return Err(SemisyncError::TaskNotFound(format!(
                "{id} belongs to a registry generation that was reset"
            )));
        }
        self.tasks
            .get_mut(id.index())
            .ok_or_else(|| SemisyncError::TaskNotFound(id.to_string()))
    }
}

/// Static view of one registered task, used to build the dependency graph
/// and for dry-run output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub id: TaskId,
    pub name: TaskName,
    pub dependencies: Vec<TaskName>,
    /// Invocations queued and not yet launched.
    pub pending: usize,
}

/// Shared handle to the task registry.
///
/// Cloning is cheap and every clone sees the same registry. All mutation
/// goes through one internal mutex, so invocations may be enqueued from other
/// threads (or from callbacks) while a run is in progress.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<RegistryState>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Registry")
            .field("generation", &state.generation)
            .field("tasks", &state.tasks.len())
            .field("run_active", &state.run_active)
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        // Every critical section leaves the state consistent, so a panic
        // elsewhere while holding the lock does not invalidate it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a task, or merge into an existing registration of the same
    /// name.
    ///
    /// Re-registering returns the original [`TaskId`]. The new work replaces
    /// the old work and a new callback replaces the old callback. The
    /// dependency set is fixed by the first registration: an empty list means
    /// "not redeclared", any other list must match it exactly.
    pub fn register(&self, spec: TaskSpec) -> Result<TaskId> {
        let TaskSpec {
            name,
            work,
            after,
            callback,
        } = spec;

        if name.trim().is_empty() {
            return Err(SemisyncError::ConfigError(
                "task name must not be empty".to_string(),
            ));
        }

        let mut dependencies = Vec::with_capacity(after.len());
        for dep in after {
            if dep == name {
                return Err(SemisyncError::ConfigError(format!(
                    "task '{name}' cannot depend on itself"
                )));
            }
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }

        let mut state = self.state();
        if state.run_active {
            return Err(SemisyncError::RunInProgress);
        }

        if let Some(&id) = state.by_name.get(&name) {
            let entry = state.entry_mut(id)?;
            if !dependencies.is_empty() {
                let declared: BTreeSet<&TaskName> = entry.dependencies.iter().collect();
                let redeclared: BTreeSet<&TaskName> = dependencies.iter().collect();
                if declared != redeclared {
                    return Err(SemisyncError::ConfigError(format!(
                        "task '{name}' was registered with dependencies {:?}; cannot redeclare them as {:?}",
                        entry.dependencies, dependencies
                    )));
                }
            }
            entry.work = work;
            if callback.is_some() {
                entry.callback = callback;
            }
            debug!(task = %name, id = %id, "merged task re-registration");
            return Ok(id);
        }

        let index = u32::try_from(state.tasks.len()).map_err(|_| {
            SemisyncError::ConfigError("too many tasks registered".to_string())
        })?;
        let id = TaskId::new(state.generation, index);

        debug!(task = %name, id = %id, deps = ?dependencies, "registered task");

        state.by_name.insert(name.clone(), id);
        state.tasks.push(TaskEntry {
            id,
            name,
            work,
            dependencies,
            callback,
            pending: VecDeque::new(),
            next_seq: 0,
            run_mark: RunMark::NotLaunched,
        });

        Ok(id)
    }

    /// Queue one invocation of `task`.
    ///
    /// Allowed before a run and, during a run, only for tasks that have not
    /// been launched yet. Enqueueing onto a task that was already drained (or
    /// that is blocked by a failed dependency) is a caller error: the
    /// invocation would never run, so it is rejected instead of stranded.
    pub fn enqueue<I>(&self, task: TaskId, args: I) -> Result<InvocationId>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut state = self.state();
        let run_active = state.run_active;
        let entry = state.entry_mut(task)?;

        if run_active {
            match entry.run_mark {
                RunMark::NotLaunched => {}
                RunMark::Launched => {
                    return Err(SemisyncError::TaskAlreadyLaunched(entry.name.clone()));
                }
                RunMark::Blocked => return Err(SemisyncError::TaskBlocked(entry.name.clone())),
            }
        }

        let id = InvocationId {
            task,
            seq: entry.next_seq,
        };
        entry.next_seq += 1;
        entry.pending.push_back(PendingInvocation {
            id,
            args: args.into_iter().collect(),
        });

        debug!(task = %entry.name, invocation = %id, run_active, "enqueued invocation");
        Ok(id)
    }

    /// Remove and return every pending invocation of `task`, in enqueue order.
    ///
    /// Only allowed between runs; during a run the engine owns the queues.
    pub fn drain(&self, task: TaskId) -> Result<Vec<PendingInvocation>> {
        let mut state = self.state();
        if state.run_active {
            return Err(SemisyncError::RunInProgress);
        }
        let entry = state.entry_mut(task)?;
        let drained: Vec<PendingInvocation> = entry.pending.drain(..).collect();
        debug!(task = %entry.name, invocations = drained.len(), "drained pending invocations");
        Ok(drained)
    }

    pub fn pending_count(&self, task: TaskId) -> Result<usize> {
        let state = self.state();
        Ok(state.entry(task)?.pending.len())
    }

    pub fn lookup(&self, name: &str) -> Option<TaskId> {
        self.state().by_name.get(name).copied()
    }

    pub fn name_of(&self, task: TaskId) -> Option<TaskName> {
        let state = self.state();
        state.entry(task).ok().map(|e| e.name.clone())
    }

    pub fn len(&self) -> usize {
        self.state().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().tasks.is_empty()
    }

    /// Whether a run currently owns this registry.
    pub fn is_running(&self) -> bool {
        self.state().run_active
    }

    /// Summaries of every registered task, in registration order.
    pub fn snapshot(&self) -> Vec<TaskSummary> {
        self.state()
            .tasks
            .iter()
            .map(|e| TaskSummary {
                id: e.id,
                name: e.name.clone(),
                dependencies: e.dependencies.clone(),
                pending: e.pending.len(),
            })
            .collect()
    }

    /// Drop every registration and pending invocation.
    ///
    /// Ids issued before the reset are rejected afterwards.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.state();
        if state.run_active {
            return Err(SemisyncError::RunInProgress);
        }
        let generation = state.generation + 1;
        *state = RegistryState {
            generation,
            ..RegistryState::default()
        };
        info!(generation, "registry reset");
        Ok(())
    }

    /// Claim the registry for a run. Per-run launch marks start clean.
    pub(crate) fn begin_run(&self) -> Result<()> {
        let mut state = self.state();
        if state.run_active {
            return Err(SemisyncError::RunInProgress);
        }
        state.run_active = true;
        for entry in state.tasks.iter_mut() {
            entry.run_mark = RunMark::NotLaunched;
        }
        Ok(())
    }

    pub(crate) fn end_run(&self) {
        self.state().run_active = false;
    }

    /// Mark `task` launched for this run and drain its pending invocations.
    pub(crate) fn launch_batch(&self, task: TaskId) -> Vec<ScheduledInvocation> {
        let mut state = self.state();
        let Ok(entry) = state.entry_mut(task) else {
            return Vec::new();
        };
        entry.run_mark = RunMark::Launched;

        let work = Arc::clone(&entry.work);
        let task_name = entry.name.clone();
        entry
            .pending
            .drain(..)
            .map(|p| ScheduledInvocation {
                id: p.id,
                task_name: task_name.clone(),
                args: p.args,
                work: Arc::clone(&work),
            })
            .collect()
    }

    pub(crate) fn mark_blocked(&self, task: TaskId) {
        if let Ok(entry) = self.state().entry_mut(task) {
            entry.run_mark = RunMark::Blocked;
        }
    }

    pub(crate) fn callback_of(&self, task: TaskId) -> Option<Callback> {
        self.state().entry(task).ok().and_then(|e| e.callback.clone())
    }
}
