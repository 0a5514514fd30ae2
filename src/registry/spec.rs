// src/registry/spec.rs

//! Task declarations handed to [`Registry::register`](super::Registry::register).

use std::fmt;
use std::sync::Arc;

use crate::registry::work::TaskWork;
use crate::types::{InvocationId, TaskId, TaskName, Value};

/// What a completion callback gets to see about one finished invocation.
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
    pub task: TaskId,
    pub name: &'a str,
    pub invocation: InvocationId,
    pub args: &'a [Value],
    pub result: &'a Value,
}

/// Called once per successfully completed invocation, on the engine's
/// control thread, after that completion's shared-state merge.
pub type Callback = Arc<dyn Fn(&Completion<'_>) + Send + Sync>;

/// Declaration of a task: its work, the tasks it waits on, and an optional
/// completion callback.
///
/// Dependencies are declared by name so a task may refer to one that is
/// registered later; names are resolved when a run starts.
#[derive(Clone)]
pub struct TaskSpec {
    pub(crate) name: TaskName,
    pub(crate) work: Arc<dyn TaskWork>,
    pub(crate) after: Vec<TaskName>,
    pub(crate) callback: Option<Callback>,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>, work: Arc<dyn TaskWork>) -> Self {
        Self {
            name: name.into(),
            work,
            after: Vec::new(),
            callback: None,
        }
    }

    /// Wait for at least one invocation of `dependency` to complete.
    pub fn after(mut self, dependency: impl Into<TaskName>) -> Self {
        self.after.push(dependency.into());
        self
    }

    pub fn after_all<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.after.extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Completion<'_>) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[TaskName] {
        &self.after
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("after", &self.after)
            .field("callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}
