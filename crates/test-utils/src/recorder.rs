use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::watch;

use semisync::registry::{Completion, TaskWork, WorkFuture, WorkerInput};

/// Something that happened to an invocation, in the order the scheduler
/// observed it.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The worker started computing `task`'s invocation `seq`.
    Started { task: String, seq: u64 },
    /// `task`'s callback fired for invocation `seq`.
    Completed {
        task: String,
        seq: u64,
        args: Vec<Value>,
        result: Value,
    },
}

/// Shared, ordered log of [`Event`]s.
///
/// - [`Recorder::work`] wraps task work so each start is logged.
/// - [`Recorder::callback`] is handed to `TaskSpec::on_complete`.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn work(&self, inner: Arc<dyn TaskWork>) -> Arc<dyn TaskWork> {
        Arc::new(Recorded {
            inner,
            recorder: self.clone(),
        })
    }

    pub fn callback(&self) -> impl Fn(&Completion<'_>) + Send + Sync + 'static {
        let recorder = self.clone();
        move |c: &Completion<'_>| {
            recorder.push(Event::Completed {
                task: c.name.to_string(),
                seq: c.invocation.seq,
                args: c.args.to_vec(),
                result: c.result.clone(),
            });
        }
    }

    /// `(seq, result)` for every completion of `task`, in callback order.
    pub fn completions_of(&self, task: &str) -> Vec<(u64, Value)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Completed {
                    task: t,
                    seq,
                    result,
                    ..
                } if t == task => Some((seq, result)),
                _ => None,
            })
            .collect()
    }

    /// Position of `task`'s first start in the log.
    pub fn first_start(&self, task: &str) -> Option<usize> {
        self.events()
            .iter()
            .position(|e| matches!(e, Event::Started { task: t, .. } if t == task))
    }

    /// Position of `task`'s first callback in the log.
    pub fn first_completion(&self, task: &str) -> Option<usize> {
        self.events()
            .iter()
            .position(|e| matches!(e, Event::Completed { task: t, .. } if t == task))
    }

    pub fn starts_of(&self, task: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Started { task: t, .. } if t == task))
            .count()
    }
}

struct Recorded {
    inner: Arc<dyn TaskWork>,
    recorder: Recorder,
}

impl TaskWork for Recorded {
    fn start(&self, input: WorkerInput) -> WorkFuture {
        self.recorder.push(Event::Started {
            task: input.task_name.clone(),
            seq: input.invocation.seq,
        });
        self.inner.start(input)
    }
}

/// One-shot latch: workers [`wait`](Gate::wait) until a test (or a callback)
/// calls [`open`](Gate::open).
#[derive(Debug, Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}
