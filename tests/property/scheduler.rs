use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use serde_json::json;

use semisync::dag::DagGraph;
use semisync::engine::{EngineCore, TaskOutcome, TaskRunState};
use semisync::registry::Registry;
use semisync::{InvocationId, TaskId, TaskSpec};
use semisync_test_utils::builders::echo;

#[derive(Debug, Clone)]
struct Workload {
    /// `deps[i]` only names tasks `< i`, so every workload is acyclic.
    deps: Vec<Vec<usize>>,
    /// Invocations queued per task, at least one each.
    invocations: Vec<usize>,
}

fn workload_strategy(max_tasks: usize) -> impl Strategy<Value = Workload> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        (
            proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), num_tasks),
            proptest::collection::vec(1..=3usize, num_tasks),
        )
            .prop_map(|(raw_deps, invocations)| {
                let deps = raw_deps
                    .into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let mut valid: Vec<usize> = if i == 0 {
                            Vec::new()
                        } else {
                            picks.into_iter().map(|p| p % i).collect()
                        };
                        valid.sort_unstable();
                        valid.dedup();
                        valid
                    })
                    .collect();
                Workload { deps, invocations }
            })
    })
}

fn build_registry(workload: &Workload) -> (Registry, Vec<TaskId>) {
    let registry = Registry::new();
    let mut ids = Vec::with_capacity(workload.deps.len());

    for (i, deps) in workload.deps.iter().enumerate() {
        let spec = TaskSpec::new(format!("task_{i}"), echo())
            .after_all(deps.iter().map(|d| format!("task_{d}")));
        ids.push(registry.register(spec).unwrap());
    }
    for (i, &count) in workload.invocations.iter().enumerate() {
        for k in 0..count {
            registry.enqueue(ids[i], [json!(k)]).unwrap();
        }
    }

    (registry, ids)
}

/// Tasks with a failing task somewhere upstream of them.
fn downstream_of(workload: &Workload, failing: &HashSet<usize>) -> HashSet<usize> {
    let mut tainted = HashSet::new();
    // Dependencies always have lower indices, so one forward pass suffices.
    for (i, deps) in workload.deps.iter().enumerate() {
        if deps.iter().any(|d| failing.contains(d) || tainted.contains(d)) {
            tainted.insert(i);
        }
    }
    tainted
}

proptest! {
    #[test]
    fn every_invocation_completes_exactly_once_in_dependency_order(
        workload in workload_strategy(8),
        picks in proptest::collection::vec(any::<usize>(), 1..64),
    ) {
        let (registry, ids) = build_registry(&workload);
        let index_of: HashMap<TaskId, usize> =
            ids.iter().enumerate().map(|(i, &t)| (t, i)).collect();

        let mut core = EngineCore::new(DagGraph::build(&registry.snapshot()).unwrap());
        let mut executing: Vec<InvocationId> = Vec::new();
        let mut completed: HashMap<InvocationId, usize> = HashMap::new();

        for inv in core.start(&registry).launched {
            let task = index_of[&inv.id.task];
            prop_assert!(workload.deps[task].is_empty());
            executing.push(inv.id);
        }

        let total: usize = workload.invocations.iter().sum();
        let mut steps = 0;
        while !executing.is_empty() {
            prop_assert!(steps < total, "more completions than invocations");
            let pick = picks[steps % picks.len()] % executing.len();
            steps += 1;

            let done = executing.swap_remove(pick);
            *completed.entry(done).or_default() += 1;

            let step = core.step_completion(done, TaskOutcome::Success, &registry);
            for inv in step.launched {
                let task = index_of[&inv.id.task];
                for &dep in &workload.deps[task] {
                    prop_assert_eq!(core.state_of(ids[dep]), Some(TaskRunState::Completed));
                }
                executing.push(inv.id);
            }
            prop_assert_eq!(step.run_finished, executing.is_empty());
        }

        prop_assert_eq!(completed.len(), total);
        prop_assert!(completed.values().all(|&n| n == 1));
        prop_assert_eq!(core.outstanding(), 0);
        for &task in &ids {
            prop_assert_eq!(core.state_of(task), Some(TaskRunState::Completed));
        }
    }

    #[test]
    fn failures_block_exactly_the_downstream_tasks(
        workload in workload_strategy(8),
        picks in proptest::collection::vec(any::<usize>(), 1..64),
        failing_indices in proptest::collection::vec(0..8usize, 0..3),
    ) {
        let (registry, ids) = build_registry(&workload);
        let failing: HashSet<usize> = failing_indices
            .into_iter()
            .filter(|&i| i < ids.len())
            .collect();
        let index_of: HashMap<TaskId, usize> =
            ids.iter().enumerate().map(|(i, &t)| (t, i)).collect();

        let mut core = EngineCore::new(DagGraph::build(&registry.snapshot()).unwrap());
        let mut executing: Vec<InvocationId> =
            core.start(&registry).launched.into_iter().map(|i| i.id).collect();

        let total: usize = workload.invocations.iter().sum();
        let mut steps = 0;
        while !executing.is_empty() {
            prop_assert!(steps < total, "more completions than invocations");
            let pick = picks[steps % picks.len()] % executing.len();
            steps += 1;

            let done = executing.swap_remove(pick);
            let outcome = if failing.contains(&index_of[&done.task]) {
                TaskOutcome::Failed("injected".to_string())
            } else {
                TaskOutcome::Success
            };
            let step = core.step_completion(done, outcome, &registry);
            executing.extend(step.launched.into_iter().map(|i| i.id));
        }

        let downstream = downstream_of(&workload, &failing);
        for (i, &task) in ids.iter().enumerate() {
            let expected = if downstream.contains(&i) {
                TaskRunState::Blocked
            } else if failing.contains(&i) {
                TaskRunState::Failed
            } else {
                TaskRunState::Completed
            };
            prop_assert_eq!(core.state_of(task), Some(expected), "task_{}", i);
        }

        let blocked: HashSet<usize> = core.blocked().iter().map(|t| index_of[t]).collect();
        prop_assert_eq!(blocked, downstream);
    }
}
