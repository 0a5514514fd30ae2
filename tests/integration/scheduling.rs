// tests/integration/scheduling.rs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use semisync::registry::Completion;
use semisync::{Scheduler, SemisyncError, TaskSpec};
use semisync_test_utils::builders::{delayed_echo, echo, held_echo, sleep_then_echo};
use semisync_test_utils::recorder::{Event, Gate, Recorder};
use semisync_test_utils::{init_tracing, with_timeout};

use crate::TestResult;

#[tokio::test]
async fn independent_tasks_all_complete() -> TestResult {
    init_tracing();

    let mut scheduler = Scheduler::default();
    let a = scheduler.register(TaskSpec::new("a", echo()))?;
    let b = scheduler.register(TaskSpec::new("b", echo()))?;
    scheduler.enqueue(a, [json!(1)])?;
    scheduler.enqueue(a, [json!(2)])?;
    scheduler.enqueue(b, [json!(3)])?;

    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.results_of(a), &[json!(1), json!(2)]);
    assert_eq!(report.results_of(b), &[json!(3)]);
    assert_eq!(report.launched, 3);
    assert_eq!(report.completed, 3);
    assert_eq!(report.run_id, 1);
    Ok(())
}

#[tokio::test]
async fn dependent_waits_for_every_dependency() -> TestResult {
    init_tracing();

    let recorder = Recorder::new();
    let mut scheduler = Scheduler::default();

    let a = scheduler.register(
        TaskSpec::new("a", recorder.work(delayed_echo(Duration::from_millis(40))))
            .on_complete(recorder.callback()),
    )?;
    let b = scheduler.register(
        TaskSpec::new("b", recorder.work(delayed_echo(Duration::from_millis(10))))
            .on_complete(recorder.callback()),
    )?;
    let c = scheduler.register(
        TaskSpec::new("c", recorder.work(echo()))
            .after_all(["a", "b"])
            .on_complete(recorder.callback()),
    )?;
    scheduler.enqueue(a, [json!("a")])?;
    scheduler.enqueue(b, [json!("b")])?;
    scheduler.enqueue(c, [json!("c")])?;

    with_timeout(scheduler.run()).await?;

    let c_start = recorder.first_start("c").expect("c never started");
    assert!(c_start > recorder.first_completion("a").expect("a never completed"));
    assert!(c_start > recorder.first_completion("b").expect("b never completed"));
    Ok(())
}

#[tokio::test]
async fn task_without_dependencies_does_not_wait() -> TestResult {
    init_tracing();

    let recorder = Recorder::new();
    let mut scheduler = Scheduler::default();

    let slow = scheduler.register(
        TaskSpec::new("slow", recorder.work(delayed_echo(Duration::from_millis(100))))
            .on_complete(recorder.callback()),
    )?;
    let quick = scheduler.register(
        TaskSpec::new("quick", recorder.work(echo())).on_complete(recorder.callback()),
    )?;
    scheduler.enqueue(slow, [json!(1)])?;
    scheduler.enqueue(quick, [json!(2)])?;

    with_timeout(scheduler.run()).await?;

    let quick_start = recorder.first_start("quick").expect("quick never started");
    let slow_done = recorder.first_completion("slow").expect("slow never completed");
    assert!(quick_start < slow_done);
    Ok(())
}

/// `multiply` depends on `add`. The second `add` is held until `multiply`
/// finishes, so the run can only complete if the first `add` releases it.
#[tokio::test]
async fn first_completion_of_a_dependency_releases_dependents() -> TestResult {
    init_tracing();

    let recorder = Recorder::new();
    let gate = Gate::new();
    let mut scheduler = Scheduler::default();

    let add = scheduler.register(
        TaskSpec::new("add", recorder.work(held_echo(gate.clone(), json!(2))))
            .on_complete(recorder.callback()),
    )?;

    let record = recorder.callback();
    let release = gate.clone();
    let multiply = scheduler.register(
        TaskSpec::new("multiply", recorder.work(echo()))
            .after("add")
            .on_complete(move |c: &Completion<'_>| {
                record(c);
                release.open();
            }),
    )?;

    scheduler.enqueue(add, [json!(1)])?;
    scheduler.enqueue(add, [json!(2)])?;
    scheduler.enqueue(multiply, [json!(3)])?;

    let report = with_timeout(scheduler.run()).await?;

    assert!(gate.is_open());
    assert_eq!(report.results_of(add), &[json!(1), json!(2)]);
    assert_eq!(report.results_of(multiply), &[json!(3)]);
    assert_eq!(recorder.starts_of("multiply"), 1);

    let events = recorder.events();
    let multiply_done = recorder.first_completion("multiply").expect("multiply never completed");
    let second_add_done = events
        .iter()
        .position(|e| matches!(e, Event::Completed { task, seq: 1, .. } if task == "add"))
        .expect("second add never completed");
    assert!(multiply_done < second_add_done);
    Ok(())
}

#[tokio::test]
async fn callback_receives_each_invocations_own_result() -> TestResult {
    init_tracing();

    let recorder = Recorder::new();
    let mut scheduler = Scheduler::default();

    // Second argument is a delay, so completions arrive out of enqueue order.
    let task = scheduler.register(
        TaskSpec::new("task", sleep_then_echo()).on_complete(recorder.callback()),
    )?;
    scheduler.enqueue(task, [json!("first"), json!(60)])?;
    scheduler.enqueue(task, [json!("second"), json!(0)])?;
    scheduler.enqueue(task, [json!("third"), json!(30)])?;

    let report = with_timeout(scheduler.run()).await?;

    let mut seen = recorder.completions_of("task");
    assert_eq!(seen.len(), 3);
    seen.sort_by_key(|(seq, _)| *seq);
    assert_eq!(
        seen,
        vec![
            (0, json!("first")),
            (1, json!("second")),
            (2, json!("third")),
        ]
    );

    for event in recorder.events() {
        if let Event::Completed { args, result, .. } = event {
            assert_eq!(args[0], result);
        }
    }

    assert_eq!(
        report.results_of(task),
        &[json!("first"), json!("second"), json!("third")]
    );
    Ok(())
}

#[tokio::test]
async fn dependency_may_be_registered_after_its_dependent() -> TestResult {
    init_tracing();

    let mut scheduler = Scheduler::default();
    let late = scheduler.register(TaskSpec::new("late", echo()).after("early"))?;
    let early = scheduler.register(TaskSpec::new("early", echo()))?;
    scheduler.enqueue(late, [json!("late")])?;
    scheduler.enqueue(early, [json!("early")])?;

    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.results_of(late), &[json!("late")]);
    assert_eq!(report.results_of(early), &[json!("early")]);
    Ok(())
}

#[tokio::test]
async fn eligible_task_with_nothing_queued_is_skipped() -> TestResult {
    init_tracing();

    let mut scheduler = Scheduler::default();
    let a = scheduler.register(TaskSpec::new("a", echo()))?;
    let idle = scheduler.register(TaskSpec::new("idle", echo()))?;
    scheduler.enqueue(a, [json!(1)])?;

    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.launched, 1);
    assert!(report.results_of(idle).is_empty());
    Ok(())
}

#[tokio::test]
async fn callback_may_enqueue_onto_a_task_not_yet_launched() -> TestResult {
    init_tracing();

    let mut scheduler = Scheduler::default();
    let registry = scheduler.registry();

    let follow_up = scheduler.register(TaskSpec::new("follow_up", echo()).after("seed"))?;
    scheduler.enqueue(follow_up, [json!("queued before run")])?;

    let seed = scheduler.register(TaskSpec::new("seed", echo()).on_complete(
        move |c: &Completion<'_>| {
            let _ = registry.enqueue(follow_up, [c.result.clone()]);
        },
    ))?;
    scheduler.enqueue(seed, [json!("queued by callback")])?;

    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(
        report.results_of(follow_up),
        &[json!("queued before run"), json!("queued by callback")]
    );
    Ok(())
}

#[tokio::test]
async fn enqueue_onto_launched_task_is_rejected() -> TestResult {
    init_tracing();

    let mut scheduler = Scheduler::default();
    let registry = scheduler.registry();
    let rejected: Arc<Mutex<Option<SemisyncError>>> = Arc::new(Mutex::new(None));

    let slot = Arc::clone(&rejected);
    let task = scheduler.register(TaskSpec::new("task", echo()).on_complete(
        move |c: &Completion<'_>| {
            if let Err(err) = registry.enqueue(c.task, [json!("too late")]) {
                *slot.lock().unwrap() = Some(err);
            }
        },
    ))?;
    scheduler.enqueue(task, [json!(1)])?;

    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.results_of(task), &[json!(1)]);
    match rejected.lock().unwrap().take() {
        Some(SemisyncError::TaskAlreadyLaunched(name)) => assert_eq!(name, "task"),
        other => panic!("expected TaskAlreadyLaunched, got {other:?}"),
    }

    // Nothing was stranded: the rejected invocation never entered the queue.
    assert_eq!(scheduler.registry().pending_count(task)?, 0);
    Ok(())
}
