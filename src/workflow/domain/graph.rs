//! Task-blocking dependency graph.
//!
//! Edges point from a task to the tasks it is blocked by. The graph keeps a
//! forward index (`blockers`) and a reverse index (`dependents`) so both
//! directions are answered without scanning.

use super::{TaskId, WorkflowDomainError};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// A cycle that an edge replacement would introduce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingCycle {
    /// Task ids along the cycle in "blocked by" order, starting and ending
    /// with the task whose blockers were being replaced.
    pub path: Vec<TaskId>,
}

impl From<BlockingCycle> for WorkflowDomainError {
    fn from(value: BlockingCycle) -> Self {
        Self::BlockingCycle { path: value.path }
    }
}

/// Forward and reverse adjacency for one project's blocking edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockingGraph {
    blockers: HashMap<TaskId, BTreeSet<TaskId>>,
    dependents: HashMap<TaskId, BTreeSet<TaskId>>,
}

impl BlockingGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from `(task, blocked_by)` pairs.
    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (TaskId, &'a BTreeSet<TaskId>)>,
    {
        let mut graph = Self::new();
        for (task, blocked_by) in edges {
            graph.replace_blockers(task, blocked_by.clone());
        }
        graph
    }

    /// Returns the tasks `task` is blocked by.
    pub fn blockers_of(&self, task: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.blockers.get(&task).into_iter().flatten().copied()
    }

    /// Returns the tasks blocked by `task`.
    pub fn dependents_of(&self, task: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.dependents.get(&task).into_iter().flatten().copied()
    }

    /// Returns the total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.blockers.values().map(BTreeSet::len).sum()
    }

    /// Checks whether replacing the blockers of `task` with `candidate`
    /// keeps the graph acyclic.
    ///
    /// Runs one depth-first search from the candidate blockers along
    /// existing edges, excluding the edges being replaced. Reaching `task`
    /// means the replacement would close a loop.
    ///
    /// # Errors
    ///
    /// Returns the offending [`BlockingCycle`]. A self-loop is reported as
    /// `[task, task]`.
    pub fn validate_replacement(
        &self,
        task: TaskId,
        candidate: &BTreeSet<TaskId>,
    ) -> Result<(), BlockingCycle> {
        if candidate.contains(&task) {
            return Err(BlockingCycle {
                path: vec![task, task],
            });
        }

        let mut parent: HashMap<TaskId, TaskId> = HashMap::with_capacity(candidate.len());
        let mut stack: Vec<TaskId> = Vec::with_capacity(candidate.len());
        for &blocker in candidate {
            parent.insert(blocker, task);
            stack.push(blocker);
        }

        while let Some(node) = stack.pop() {
            for next in self.blockers_of(node) {
                if next == task {
                    return Err(BlockingCycle {
                        path: trace_cycle(&parent, task, node),
                    });
                }
                if let std::collections::hash_map::Entry::Vacant(slot) = parent.entry(next) {
                    slot.insert(node);
                    stack.push(next);
                }
            }
        }
        Ok(())
    }

    /// Replaces the blockers of `task`, keeping the reverse index in sync.
    ///
    /// Does not validate; call [`BlockingGraph::validate_replacement`] first.
    pub fn replace_blockers(&mut self, task: TaskId, blocked_by: BTreeSet<TaskId>) {
        if let Some(previous) = self.blockers.remove(&task) {
            for blocker in previous {
                self.unlink_dependent(blocker, task);
            }
        }
        for &blocker in &blocked_by {
            self.dependents.entry(blocker).or_default().insert(task);
        }
        if !blocked_by.is_empty() {
            self.blockers.insert(task, blocked_by);
        }
    }

    /// Removes `task` and every edge touching it.
    ///
    /// Returns the tasks that were blocked by `task`.
    pub fn remove_task(&mut self, task: TaskId) -> BTreeSet<TaskId> {
        self.replace_blockers(task, BTreeSet::new());
        let former = self.dependents.remove(&task).unwrap_or_default();
        for &dependent in &former {
            let now_empty = self.blockers.get_mut(&dependent).is_some_and(|set| {
                set.remove(&task);
                set.is_empty()
            });
            if now_empty {
                self.blockers.remove(&dependent);
            }
        }
        former
    }

    /// Returns whether the graph has no cycles (Kahn's algorithm).
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        let mut remaining: HashMap<TaskId, usize> = self
            .blockers
            .iter()
            .map(|(task, set)| (*task, set.len()))
            .collect();
        let mut ready: VecDeque<TaskId> = self
            .dependents
            .keys()
            .filter(|task| !remaining.contains_key(task))
            .copied()
            .collect();

        while let Some(task) = ready.pop_front() {
            for dependent in self.dependents_of(task) {
                if let Some(count) = remaining.get_mut(&dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        remaining.remove(&dependent);
                        ready.push_back(dependent);
                    }
                }
            }
        }
        remaining.is_empty()
    }

    fn unlink_dependent(&mut self, blocker: TaskId, task: TaskId) {
        let now_empty = self.dependents.get_mut(&blocker).is_some_and(|set| {
            set.remove(&task);
            set.is_empty()
        });
        if now_empty {
            self.dependents.remove(&blocker);
        }
    }
}

fn trace_cycle(parent: &HashMap<TaskId, TaskId>, task: TaskId, last: TaskId) -> Vec<TaskId> {
    let mut reversed = vec![last];
    let mut cursor = last;
    while let Some(&previous) = parent.get(&cursor) {
        if previous == task {
            break;
        }
        reversed.push(previous);
        cursor = previous;
    }

    let mut path = Vec::with_capacity(reversed.len().saturating_add(2));
    path.push(task);
    path.extend(reversed.into_iter().rev());
    path.push(task);
    path
}
