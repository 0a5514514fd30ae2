// src/exec/pool.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::exec::completion::CompletionRecord;
use crate::registry::work::panic_message;
use crate::registry::{ScheduledInvocation, TaskError, WorkerInput};
use crate::state::SharedState;

/// Aborts the wrapped task when dropped, so aborting a worker also aborts
/// the job it is waiting on.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Launches one worker per invocation and tracks every handle it spawned.
///
/// Each worker runs the invocation's work as a separate Tokio task so that a
/// panic is observed as a `JoinError` and reported as a failure record
/// rather than silently losing the completion.
#[derive(Debug)]
pub struct WorkerPool {
    tx: mpsc::Sender<CompletionRecord>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Create a pool and the receiving end of its completion channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<CompletionRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                handles: Vec::new(),
            },
            rx,
        )
    }

    /// Start `invocation` as an independent worker.
    pub fn launch(&mut self, invocation: ScheduledInvocation, shared: Arc<SharedState>) {
        let ScheduledInvocation {
            id,
            task_name,
            args,
            work,
        } = invocation;
        let tx = self.tx.clone();

        let input = WorkerInput {
            invocation: id,
            task_name: task_name.clone(),
            args: args.clone(),
            shared,
        };

        trace!(task = %task_name, invocation = %id, "spawning worker");

        let handle = tokio::spawn(async move {
            let mut job = AbortOnDrop(tokio::spawn(work.start(input)));

            let outcome = match (&mut job.0).await {
                Ok(result) => result,
                Err(err) if err.is_panic() => Err(TaskError::new(format!(
                    "worker panicked: {}",
                    panic_message(err.into_panic())
                ))),
                Err(err) => Err(TaskError::new(format!("worker cancelled: {err}"))),
            };

            let record = CompletionRecord {
                invocation: id,
                task_name,
                args,
                outcome,
            };

            if tx.send(record).await.is_err() {
                debug!(invocation = %id, "completion channel closed; dropping record");
            }
        });

        self.handles.push(handle);
    }

    /// Workers spawned and not yet joined.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Request that every worker stop at its next await point.
    pub fn abort_all(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }

    /// Wait until every spawned worker has exited.
    pub async fn drain_all(&mut self) {
        let count = self.handles.len();
        for handle in self.handles.drain(..) {
            match handle.await {
                Ok(()) => {}
                Err(err) if err.is_cancelled() => {
                    trace!("worker was aborted");
                }
                Err(err) => {
                    warn!(error = %err, "worker exited abnormally");
                }
            }
        }
        debug!(workers = count, "drained worker pool");
    }
}

// Reached without a drain when `run()` is cancelled or a callback panics.
impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            debug!(workers = self.handles.len(), "pool dropped; aborting workers");
        }
        self.abort_all();
    }
}
