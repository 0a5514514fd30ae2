// src/registry/work.rs

//! The unit of work bound to a task.
//!
//! A task's work only ever sees its own [`WorkerInput`]: the invocation's
//! arguments plus a read-only snapshot of the shared state as of launch. It
//! reports back through a [`TaskOutput`] (or a [`TaskError`]), never through
//! memory shared with other workers.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::state::{SharedState, StateDelta};
use crate::types::{InvocationId, TaskName, Value};

/// Boxed future returned by [`TaskWork::start`].
pub type WorkFuture = Pin<Box<dyn Future<Output = Result<TaskOutput, TaskError>> + Send + 'static>>;

/// Everything a worker gets to compute one invocation.
#[derive(Debug, Clone)]
pub struct WorkerInput {
    pub invocation: InvocationId,
    pub task_name: TaskName,
    pub args: Vec<Value>,
    /// Master shared state as of the moment this invocation was launched.
    pub shared: Arc<SharedState>,
}

impl WorkerInput {
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Argument `index` as an `i64`, or a [`TaskError`] naming the problem.
    pub fn arg_i64(&self, index: usize) -> Result<i64, TaskError> {
        self.arg(index).and_then(Value::as_i64).ok_or_else(|| {
            TaskError::new(format!(
                "task '{}' expected an integer argument at position {index}",
                self.task_name
            ))
        })
    }
}

/// Result of one invocation: the value handed to the callback plus an
/// optional shared-state delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutput {
    pub value: Value,
    pub delta: Option<StateDelta>,
}

impl TaskOutput {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            delta: None,
        }
    }

    /// Attach a shared-state field update to this output.
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.delta
            .get_or_insert_with(StateDelta::new)
            .insert(field.into(), value.into());
        self
    }

    pub fn with_delta(mut self, delta: StateDelta) -> Self {
        self.delta = Some(delta);
        self
    }
}

impl From<Value> for TaskOutput {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Failure reported by a worker in place of a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Work that computes a single invocation.
///
/// Implementations must not block the async runtime; use [`blocking`] for
/// functions that sleep or do CPU-heavy work.
pub trait TaskWork: Send + Sync + 'static {
    fn start(&self, input: WorkerInput) -> WorkFuture;
}

impl fmt::Debug for dyn TaskWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TaskWork")
    }
}

struct AsyncWork<F>(F);

impl<F, Fut, O, E> TaskWork for AsyncWork<F>
where
    F: Fn(WorkerInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    O: Into<TaskOutput>,
    E: Into<TaskError>,
{
    fn start(&self, input: WorkerInput) -> WorkFuture {
        let fut = (self.0)(input);
        Box::pin(async move {
            let result: Result<TaskOutput, TaskError> = fut.await.map(Into::into).map_err(Into::into);
            result
        })
    }
}

struct BlockingWork<F>(Arc<F>);

impl<F, O, E> TaskWork for BlockingWork<F>
where
    F: Fn(WorkerInput) -> Result<O, E> + Send + Sync + 'static,
    O: Into<TaskOutput>,
    E: Into<TaskError>,
{
    fn start(&self, input: WorkerInput) -> WorkFuture {
        let f = Arc::clone(&self.0);
        Box::pin(async move {
            let joined = tokio::task::spawn_blocking(move || -> Result<TaskOutput, TaskError> {
                f(input).map(Into::into).map_err(Into::into)
            })
            .await;

            match joined {
                Ok(result) => result,
                Err(err) if err.is_panic() => Err(TaskError::new(format!(
                    "blocking worker panicked: {}",
                    panic_message(err.into_panic())
                ))),
                Err(err) => Err(TaskError::new(format!("blocking worker cancelled: {err}"))),
            }
        })
    }
}

/// Wrap an async function as task work.
pub fn from_async<F, Fut, O, E>(f: F) -> Arc<dyn TaskWork>
where
    F: Fn(WorkerInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    O: Into<TaskOutput>,
    E: Into<TaskError>,
{
    Arc::new(AsyncWork(f))
}

/// Wrap a blocking function as task work; each invocation runs on its own
/// OS thread from Tokio's blocking pool.
///
/// A blocking invocation cannot be interrupted. When a run times out the
/// worker is aborted and its thread is detached; it finishes in the
/// background and its result is discarded.
pub fn blocking<F, O, E>(f: F) -> Arc<dyn TaskWork>
where
    F: Fn(WorkerInput) -> Result<O, E> + Send + Sync + 'static,
    O: Into<TaskOutput>,
    E: Into<TaskError>,
{
    Arc::new(BlockingWork(Arc::new(f)))
}

pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
