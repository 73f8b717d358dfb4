//! Status derivation from blocker state.

use super::{BlockerResolution, BlockingGraph, TaskId, WorkflowStatus};
use std::collections::{HashSet, VecDeque};

/// Computes the status a task should hold given its blockers' statuses.
///
/// Only `Backlog` and `Blocked` are rewritten; every other status is
/// returned unchanged.
#[must_use]
pub fn derive_status<I>(
    current: WorkflowStatus,
    blocker_statuses: I,
    resolution: BlockerResolution,
) -> WorkflowStatus
where
    I: IntoIterator<Item = WorkflowStatus>,
{
    if !current.is_derivable() {
        return current;
    }
    let unresolved = blocker_statuses
        .into_iter()
        .any(|status| !resolution.resolves(status));
    if unresolved {
        WorkflowStatus::Blocked
    } else {
        WorkflowStatus::Backlog
    }
}

/// Propagates a status change of `origin` through its dependents.
///
/// `rederive` recomputes one task and returns whether its status changed.
/// Dependents of a task are only visited when that task changed, so the walk
/// stops at the first layer that stays put. Returns the tasks that changed,
/// in visit order.
pub fn cascade<F>(graph: &BlockingGraph, origin: TaskId, mut rederive: F) -> Vec<TaskId>
where
    F: FnMut(TaskId) -> bool,
{
    let mut changed = Vec::new();
    let mut seen: HashSet<TaskId> = HashSet::from([origin]);
    let mut queue: VecDeque<TaskId> = graph.dependents_of(origin).collect();

    while let Some(task) = queue.pop_front() {
        if !seen.insert(task) {
            continue;
        }
        if rederive(task) {
            changed.push(task);
            queue.extend(graph.dependents_of(task));
        }
    }
    changed
}
