// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::dag::validate::{ensure_acyclic, ensure_resolvable};
use crate::errors::{Result, SemisyncError};
use crate::registry::TaskSummary;
use crate::types::{TaskId, TaskName};

/// Per-run dependency graph derived from the registry.
///
/// - `depends_on[t]` holds the dependencies of `t` that have not completed
///   yet; it only ever shrinks, and `t` is eligible once it is empty.
/// - `needed_for[d]` is the reverse adjacency consumed by [`resolve`]. It is
///   cleared the first time `d` resolves, so later completions of `d` never
///   re-process its dependents.
/// - `dependents` is the same reverse adjacency, kept intact for failure
///   propagation and diagnostics.
///
/// [`resolve`]: DagGraph::resolve
#[derive(Debug, Clone)]
pub struct DagGraph {
    order: Vec<TaskId>,
    names: HashMap<TaskId, TaskName>,
    depends_on: HashMap<TaskId, HashSet<TaskId>>,
    needed_for: HashMap<TaskId, HashSet<TaskId>>,
    dependents: HashMap<TaskId, Vec<TaskId>>,
}

impl DagGraph {
    /// Build the graph for a run and reject configurations that could never
    /// finish:
    /// - a dependency on a task that was never registered,
    /// - a dependency cycle,
    /// - a dependency on a task with no queued invocations.
    pub fn build(tasks: &[TaskSummary]) -> Result<Self> {
        let ids: HashMap<&str, TaskId> = tasks.iter().map(|t| (t.name.as_str(), t.id)).collect();

        let mut graph = Self {
            order: tasks.iter().map(|t| t.id).collect(),
            names: tasks.iter().map(|t| (t.id, t.name.clone())).collect(),
            depends_on: HashMap::with_capacity(tasks.len()),
            needed_for: HashMap::new(),
            dependents: HashMap::new(),
        };

        for task in tasks {
            let mut deps = HashSet::with_capacity(task.dependencies.len());
            for dep_name in &task.dependencies {
                let dep = *ids.get(dep_name.as_str()).ok_or_else(|| {
                    SemisyncError::UnknownDependency {
                        task: task.name.clone(),
                        dependency: dep_name.clone(),
                    }
                })?;
                if deps.insert(dep) {
                    graph.needed_for.entry(dep).or_default().insert(task.id);
                    graph.dependents.entry(dep).or_default().push(task.id);
                }
            }
            graph.depends_on.insert(task.id, deps);
        }

        ensure_acyclic(&graph)?;
        ensure_resolvable(&graph, tasks)?;

        debug!(
            tasks = graph.order.len(),
            eligible = graph.eligible().len(),
            "built dependency graph"
        );

        Ok(graph)
    }

    /// All tasks, in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn name_of(&self, task: TaskId) -> &str {
        self.names
            .get(&task)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    /// Number of dependencies of `task` that have not completed yet.
    pub fn remaining(&self, task: TaskId) -> usize {
        self.depends_on.get(&task).map_or(0, HashSet::len)
    }

    pub fn is_eligible(&self, task: TaskId) -> bool {
        self.remaining(task) == 0
    }

    /// Tasks with no unresolved dependencies, in registration order.
    pub fn eligible(&self) -> Vec<TaskId> {
        self.tasks().filter(|&t| self.is_eligible(t)).collect()
    }

    /// Immediate dependents of `task` as declared.
    pub fn dependents_of(&self, task: TaskId) -> &[TaskId] {
        self.dependents
            .get(&task)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every task that transitively waits on `task`, in registration order.
    pub fn transitive_dependents(&self, task: TaskId) -> Vec<TaskId> {
        let mut stack: Vec<TaskId> = self.dependents_of(task).to_vec();
        let mut seen: HashSet<TaskId> = HashSet::new();

        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.dependents_of(next).iter().copied());
            }
        }

        let mut found: Vec<TaskId> = seen.into_iter().collect();
        found.sort();
        found
    }

    /// Record that `completed` has produced its first completion.
    ///
    /// Removes `completed` from each dependent's remaining set and returns
    /// the dependents that became eligible because of it, in registration
    /// order. Calling this again for the same task returns nothing.
    pub fn resolve(&mut self, completed: TaskId) -> Vec<TaskId> {
        let Some(waiting) = self.needed_for.remove(&completed) else {
            return Vec::new();
        };

        let mut unblocked = Vec::new();
        for dependent in waiting {
            if let Some(deps) = self.depends_on.get_mut(&dependent) {
                if deps.remove(&completed) && deps.is_empty() {
                    unblocked.push(dependent);
                }
            }
        }
        unblocked.sort();
        unblocked
    }
}
