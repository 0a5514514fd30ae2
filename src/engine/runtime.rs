// src/engine/runtime.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::engine::core::EngineCore;
use crate::engine::{RunReport, TaskOutcome, names_of};
use crate::errors::{Result, SemisyncError};
use crate::exec::{CompletionRecord, WorkerPool};
use crate::registry::{Completion, Registry, ScheduledInvocation};
use crate::state::{MergePolicy, SharedState};
use crate::types::{TaskId, Value};

/// Drives one run: feeds completion records into the [`EngineCore`] and
/// hands the invocations it releases to the [`WorkerPool`].
///
/// The shell is the only place that touches the master shared state; it
/// merges each delta, then fires the task's callback, both on this single
/// control task.
pub struct Runtime<'a> {
    run_id: u64,
    core: EngineCore,
    registry: &'a Registry,
    pool: WorkerPool,
    completions: mpsc::Receiver<CompletionRecord>,
    state: &'a mut SharedState,
    policy: &'a MergePolicy,
    deadline: Option<Duration>,
    results: BTreeMap<TaskId, BTreeMap<u64, Value>>,
}

impl fmt::Debug for Runtime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("run_id", &self.run_id)
            .field("core", &self.core)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl<'a> Runtime<'a> {
    pub fn new(
        run_id: u64,
        core: EngineCore,
        registry: &'a Registry,
        config: &'a SchedulerConfig,
        state: &'a mut SharedState,
    ) -> Self {
        let (pool, completions) = WorkerPool::new(config.channel_capacity);
        Self {
            run_id,
            core,
            registry,
            pool,
            completions,
            state,
            policy: &config.merge,
            deadline: config.deadline,
            results: BTreeMap::new(),
        }
    }

    /// Run until no invocation is outstanding, then join every worker.
    ///
    /// On a deadline or merge error the outstanding workers are aborted and
    /// joined before the error is returned.
    pub async fn run(mut self) -> Result<RunReport> {
        let started = Instant::now();
        // A deadline past the clock's range never fires.
        let deadline = self
            .deadline
            .and_then(|after| started.checked_add(after).map(|at| (at, after)));

        info!(
            run_id = self.run_id,
            tasks = self.core.graph().len(),
            deadline = ?self.deadline,
            "run started"
        );

        let step = self.core.start(self.registry);
        self.dispatch(step.launched);

        while self.core.outstanding() > 0 {
            let record = match self.next_completion(deadline).await {
                Ok(record) => record,
                Err(err) => return Err(self.shutdown(err).await),
            };
            if let Err(err) = self.handle_record(record) {
                return Err(self.shutdown(err).await);
            }
        }

        self.pool.drain_all().await;
        let elapsed = started.elapsed();

        let failures = self.core.failures().to_vec();
        let stranded = self.core.waiting_tasks();
        if !stranded.is_empty() {
            error!(
                run_id = self.run_id,
                stranded = ?names_of(&self.core, &stranded),
                "run ended with tasks whose dependencies never completed"
            );
        }
        let mut blocked = self.core.blocked().to_vec();
        blocked.extend(stranded);
        let blocked = names_of(&self.core, &blocked);

        let report = RunReport {
            run_id: self.run_id,
            results: self
                .results
                .into_iter()
                .map(|(task, by_seq)| (task, by_seq.into_values().collect()))
                .collect(),
            shared_state: self.state.clone(),
            launched: self.core.launched_total(),
            completed: self.core.completed_total(),
            elapsed,
        };

        info!(
            run_id = report.run_id,
            launched = report.launched,
            completed = report.completed,
            failed = failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished"
        );

        if failures.is_empty() && blocked.is_empty() {
            Ok(report)
        } else {
            Err(SemisyncError::RunFailed {
                failures,
                blocked,
                partial: Box::new(report),
            })
        }
    }

    async fn next_completion(
        &mut self,
        deadline: Option<(Instant, Duration)>,
    ) -> Result<CompletionRecord> {
        let received = match deadline {
            Some((at, after)) => match tokio::time::timeout_at(at, self.completions.recv()).await {
                Ok(received) => received,
                Err(_elapsed) => {
                    let outstanding = names_of(&self.core, &self.core.running_tasks());
                    error!(
                        run_id = self.run_id,
                        ?outstanding,
                        "run deadline elapsed; aborting outstanding workers"
                    );
                    return Err(SemisyncError::Timeout { after, outstanding });
                }
            },
            None => self.completions.recv().await,
        };

        received.ok_or_else(|| {
            SemisyncError::Other(anyhow!(
                "completion channel closed with {} invocation(s) outstanding",
                self.core.outstanding()
            ))
        })
    }

    fn handle_record(&mut self, record: CompletionRecord) -> Result<()> {
        let CompletionRecord {
            invocation,
            task_name,
            args,
            outcome,
        } = record;

        let outcome = match outcome {
            Ok(output) => {
                if let Some(delta) = &output.delta {
                    self.state
                        .merge(delta, self.policy)
                        .map_err(|source| SemisyncError::Merge {
                            task: task_name.clone(),
                            source,
                        })?;
                }

                if let Some(callback) = self.registry.callback_of(invocation.task) {
                    callback(&Completion {
                        task: invocation.task,
                        name: &task_name,
                        invocation,
                        args: &args,
                        result: &output.value,
                    });
                }

                debug!(
                    run_id = self.run_id,
                    task = %task_name,
                    invocation = %invocation,
                    "invocation completed"
                );
                self.results
                    .entry(invocation.task)
                    .or_default()
                    .insert(invocation.seq, output.value);
                TaskOutcome::Success
            }
            Err(err) => TaskOutcome::Failed(err.message().to_string()),
        };

        let step = self
            .core
            .step_completion(invocation, outcome, self.registry);
        self.dispatch(step.launched);
        Ok(())
    }

    fn dispatch(&mut self, batch: Vec<ScheduledInvocation>) {
        if batch.is_empty() {
            return;
        }
        let snapshot = Arc::new(SharedState::clone(self.state));
        for invocation in batch {
            self.pool.launch(invocation, Arc::clone(&snapshot));
        }
    }

    async fn shutdown(&mut self, err: SemisyncError) -> SemisyncError {
        self.pool.abort_all();
        self.pool.drain_all().await;
        err
    }
}
