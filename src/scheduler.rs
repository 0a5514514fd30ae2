// src/scheduler.rs

use tracing::info;

use crate::config::SchedulerConfig;
use crate::dag::DagGraph;
use crate::engine::{EngineCore, RunReport, Runtime};
use crate::errors::Result;
use crate::registry::{Registry, TaskSpec};
use crate::state::SharedState;
use crate::types::{InvocationId, TaskId, Value};

/// Marks the registry idle again however the run ends, including when the
/// run future is dropped.
struct ActiveRun<'a>(&'a Registry);

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.0.end_run();
    }
}

/// Dependency-aware task scheduler.
///
/// Owns a [`Registry`], the master [`SharedState`] and the run
/// configuration. Each [`run`](Scheduler::run) builds a fresh dependency
/// graph from whatever is registered and queued at that moment.
#[derive(Debug)]
pub struct Scheduler {
    registry: Registry,
    config: SchedulerConfig,
    state: SharedState,
    run_counter: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            registry: Registry::new(),
            config,
            state: SharedState::default(),
            run_counter: 0,
        }
    }

    /// Seed the master shared state.
    pub fn with_shared_state(mut self, state: SharedState) -> Self {
        self.state = state;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// A handle to the registry, e.g. for enqueueing from another thread
    /// while a run is in progress.
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    pub fn register(&self, spec: TaskSpec) -> Result<TaskId> {
        self.registry.register(spec)
    }

    pub fn enqueue<I>(&self, task: TaskId, args: I) -> Result<InvocationId>
    where
        I: IntoIterator<Item = Value>,
    {
        self.registry.enqueue(task, args)
    }

    pub fn shared_state(&self) -> &SharedState {
        &self.state
    }

    pub fn shared_state_mut(&mut self) -> &mut SharedState {
        &mut self.state
    }

    /// Execute everything queued, launching each invocation as soon as its
    /// task's dependencies have completed, and return once every launched
    /// worker has been joined.
    ///
    /// # Errors
    /// - configuration errors (unknown dependency, cycle, unresolvable
    ///   dependency) before anything is launched,
    /// - [`RunFailed`](crate::errors::SemisyncError::RunFailed) when some
    ///   invocation failed,
    /// - [`Timeout`](crate::errors::SemisyncError::Timeout) when the
    ///   configured deadline elapsed,
    /// - [`Merge`](crate::errors::SemisyncError::Merge) when a delta did not
    ///   fit the merge policy.
    pub async fn run(&mut self) -> Result<RunReport> {
        self.registry.begin_run()?;
        let _active = ActiveRun(&self.registry);

        self.run_counter += 1;
        let run_id = self.run_counter;

        let graph = DagGraph::build(&self.registry.snapshot())?;
        let core = EngineCore::new(graph);

        Runtime::new(run_id, core, &self.registry, &self.config, &mut self.state)
            .run()
            .await
    }

    /// Forget every registration, queued invocation and the shared state so
    /// the next register/enqueue/run cycle starts clean.
    pub fn reset(&mut self) -> Result<()> {
        self.registry.reset()?;
        self.state = SharedState::default();
        info!(runs = self.run_counter, "scheduler reset");
        Ok(())
    }
}
