// src/dag/validate.rs

use std::collections::BTreeSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::DagGraph;
use crate::errors::{Result, SemisyncError};
use crate::registry::TaskSummary;
use crate::types::TaskId;

/// Fail if the graph has a cycle.
///
/// Edge direction: dependency -> dependent.
pub(crate) fn ensure_acyclic(graph: &DagGraph) -> Result<()> {
    let mut g: DiGraphMap<TaskId, ()> = DiGraphMap::new();

    for task in graph.tasks() {
        g.add_node(task);
    }
    for task in graph.tasks() {
        for &dependent in graph.dependents_of(task) {
            g.add_edge(task, dependent, ());
        }
    }

    match toposort(&g, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(SemisyncError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            graph.name_of(cycle.node_id())
        ))),
    }
}

/// Fail if some task waits on a dependency that has nothing queued.
///
/// Such a dependency can never complete, so every task downstream of it is
/// stranded. The error names the first such dependency (registration order)
/// and every stranded task across all of them.
pub(crate) fn ensure_resolvable(graph: &DagGraph, tasks: &[TaskSummary]) -> Result<()> {
    let mut first_empty = None;
    let mut stranded: BTreeSet<TaskId> = BTreeSet::new();

    for task in tasks {
        if task.pending > 0 || graph.dependents_of(task.id).is_empty() {
            continue;
        }
        first_empty.get_or_insert(task.id);
        stranded.extend(graph.transitive_dependents(task.id));
    }

    match first_empty {
        None => Ok(()),
        Some(dependency) => Err(SemisyncError::UnresolvableDependency {
            dependency: graph.name_of(dependency).to_string(),
            stranded: stranded
                .into_iter()
                .map(|t| graph.name_of(t).to_string())
                .collect(),
        }),
    }
}
