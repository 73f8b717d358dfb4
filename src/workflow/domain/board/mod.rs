//! Project board: the consistency boundary for workflow mutations.
//!
//! A board is a loaded view of one project's plans, tasks, blocking edges and
//! reviews. Repositories hand a board to a unit of work under a
//! project-scoped lock, and persist whatever [`ProjectBoard::changes`]
//! reports once the work succeeds. Every mutation validates fully before it
//! writes, so a failed operation leaves the board untouched.

mod generation;
mod plans;
mod tasks;
mod transitions;

pub use generation::BreakdownTask;
pub use plans::PlanDraft;
pub use tasks::TaskDraft;
pub use transitions::TransitionOutcome;

use super::{
    BlockerResolution, BlockingGraph, HasReviews, Plan, PlanId, Project,
    ProjectSettings, Review, ReviewId, Task, TaskId, Version, WorkItem, WorkItemRef,
    WorkflowDomainError, WorkflowStatus, derive_status,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Loaded state of one project plus the record of what changed since load.
#[derive(Debug, Clone)]
pub struct ProjectBoard {
    project: Project,
    plans: BTreeMap<PlanId, Plan>,
    tasks: BTreeMap<TaskId, Task>,
    reviews: Vec<Review>,
    graph: BlockingGraph,
    baseline: Baseline,
    deleted_plans: BTreeSet<PlanId>,
    deleted_tasks: BTreeSet<TaskId>,
    created_reviews: BTreeSet<ReviewId>,
    project_changed: bool,
}

#[derive(Debug, Clone, Default)]
struct Baseline {
    plans: HashMap<PlanId, Version>,
    tasks: HashMap<TaskId, (Version, BTreeSet<TaskId>)>,
}

/// A task row to write back, with the version it was loaded at.
#[derive(Debug, Clone, Copy)]
pub struct TaskUpdate<'a> {
    /// Current state of the task.
    pub task: &'a Task,
    /// Version the stored row must still have.
    pub expected: Version,
    /// Whether the blocker set differs from the stored edges.
    pub blockers_changed: bool,
}

/// Everything a repository must persist after a unit of work.
#[derive(Debug, Clone, Default)]
pub struct BoardChanges<'a> {
    /// Project row, when its settings changed.
    pub project: Option<&'a Project>,
    /// Plans created during the unit of work.
    pub created_plans: Vec<&'a Plan>,
    /// Plans modified during the unit of work, with their loaded versions.
    pub updated_plans: Vec<(&'a Plan, Version)>,
    /// Plans deleted during the unit of work.
    pub deleted_plans: Vec<PlanId>,
    /// Tasks created during the unit of work.
    pub created_tasks: Vec<&'a Task>,
    /// Tasks modified during the unit of work.
    pub updated_tasks: Vec<TaskUpdate<'a>>,
    /// Tasks deleted during the unit of work.
    pub deleted_tasks: Vec<TaskId>,
    /// Reviews recorded during the unit of work.
    pub created_reviews: Vec<&'a Review>,
}

impl BoardChanges<'_> {
    /// Returns whether nothing needs to be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.project.is_none()
            && self.created_plans.is_empty()
            && self.updated_plans.is_empty()
            && self.deleted_plans.is_empty()
            && self.created_tasks.is_empty()
            && self.updated_tasks.is_empty()
            && self.deleted_tasks.is_empty()
            && self.created_reviews.is_empty()
    }

    /// Returns references to every deleted work item.
    #[must_use]
    pub fn deleted_items(&self) -> Vec<WorkItemRef> {
        self.deleted_plans
            .iter()
            .copied()
            .map(WorkItemRef::Plan)
            .chain(self.deleted_tasks.iter().copied().map(WorkItemRef::Task))
            .collect()
    }
}

impl ProjectBoard {
    /// Builds a board from persisted state and records it as the baseline.
    #[must_use]
    pub fn load(
        project: Project,
        stored_plans: impl IntoIterator<Item = Plan>,
        stored_tasks: impl IntoIterator<Item = Task>,
        stored_reviews: impl IntoIterator<Item = Review>,
    ) -> Self {
        let plans: BTreeMap<PlanId, Plan> = stored_plans.into_iter().map(|p| (p.id(), p)).collect();
        let tasks: BTreeMap<TaskId, Task> = stored_tasks.into_iter().map(|t| (t.id(), t)).collect();
        let mut reviews: Vec<Review> = stored_reviews.into_iter().collect();
        reviews.sort_by_key(Review::created_at);

        let graph = BlockingGraph::from_edges(tasks.values().map(|t| (t.id(), t.blocked_by())));
        let baseline = Baseline {
            plans: plans.values().map(|p| (p.id(), p.version())).collect(),
            tasks: tasks
                .values()
                .map(|t| (t.id(), (t.version(), t.blocked_by().clone())))
                .collect(),
        };

        Self {
            project,
            plans,
            tasks,
            reviews,
            graph,
            baseline,
            deleted_plans: BTreeSet::new(),
            deleted_tasks: BTreeSet::new(),
            created_reviews: BTreeSet::new(),
            project_changed: false,
        }
    }

    /// Returns the project.
    #[must_use]
    pub const fn project(&self) -> &Project {
        &self.project
    }

    /// Returns the blocking graph.
    #[must_use]
    pub const fn graph(&self) -> &BlockingGraph {
        &self.graph
    }

    /// Returns a plan by id.
    #[must_use]
    pub fn plan(&self, id: PlanId) -> Option<&Plan> {
        self.plans.get(&id)
    }

    /// Returns a task by id.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Returns every plan, ordered by id.
    pub fn plans(&self) -> impl Iterator<Item = &Plan> {
        self.plans.values()
    }

    /// Returns every task, ordered by id.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Returns every review, oldest first.
    #[must_use]
    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// Returns an owned copy of a plan or task.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the item is not on the board.
    pub fn item(&self, item: WorkItemRef) -> Result<WorkItem, WorkflowDomainError> {
        match item {
            WorkItemRef::Plan(id) => self.require_plan(id).cloned().map(WorkItem::Plan),
            WorkItemRef::Task(id) => self.require_task(id).cloned().map(WorkItem::Task),
        }
    }

    /// Replaces the project's workflow settings.
    pub fn update_settings(&mut self, settings: ProjectSettings, now: DateTime<Utc>) -> &Project {
        self.project.replace_settings(settings, now);
        self.project_changed = true;
        &self.project
    }

    /// Reports everything that changed since the board was loaded.
    #[must_use]
    pub fn changes(&self) -> BoardChanges<'_> {
        let mut changes = BoardChanges {
            deleted_plans: self.deleted_plans.iter().copied().collect(),
            deleted_tasks: self.deleted_tasks.iter().copied().collect(),
            ..BoardChanges::default()
        };

        if self.project_changed {
            changes.project = Some(&self.project);
        }

        for plan in self.plans.values() {
            match self.baseline.plans.get(&plan.id()) {
                None => changes.created_plans.push(plan),
                Some(&loaded) if loaded != plan.version() => {
                    changes.updated_plans.push((plan, loaded));
                }
                Some(_) => {}
            }
        }

        for task in self.tasks.values() {
            match self.baseline.tasks.get(&task.id()) {
                None => changes.created_tasks.push(task),
                Some((loaded, edges)) if *loaded != task.version() => {
                    changes.updated_tasks.push(TaskUpdate {
                        task,
                        expected: *loaded,
                        blockers_changed: edges != task.blocked_by(),
                    });
                }
                Some(_) => {}
            }
        }

        changes.created_reviews = self
            .reviews
            .iter()
            .filter(|review| self.created_reviews.contains(&review.id()))
            .collect();
        changes
    }

    pub(crate) fn require_plan(&self, id: PlanId) -> Result<&Plan, WorkflowDomainError> {
        self.plans
            .get(&id)
            .ok_or(WorkflowDomainError::PlanNotFound(id))
    }

    pub(crate) fn require_task(&self, id: TaskId) -> Result<&Task, WorkflowDomainError> {
        self.tasks
            .get(&id)
            .ok_or(WorkflowDomainError::TaskNotFound(id))
    }

    fn plan_mut(&mut self, id: PlanId) -> Result<&mut Plan, WorkflowDomainError> {
        self.plans
            .get_mut(&id)
            .ok_or(WorkflowDomainError::PlanNotFound(id))
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, WorkflowDomainError> {
        self.tasks
            .get_mut(&id)
            .ok_or(WorkflowDomainError::TaskNotFound(id))
    }

    /// Statuses of the tasks currently blocking `task`.
    fn blocker_statuses(&self, task: TaskId) -> Vec<WorkflowStatus> {
        statuses_of(&self.tasks, self.graph.blockers_of(task))
    }

    fn drop_reviews_of(&mut self, target: WorkItemRef) {
        self.reviews.retain(|review| review.target() != target);
    }
}

impl HasReviews for ProjectBoard {
    fn reviews_of(&self, target: WorkItemRef) -> Vec<&Review> {
        self.reviews
            .iter()
            .filter(|review| review.target() == target)
            .collect()
    }
}

fn statuses_of(
    tasks: &BTreeMap<TaskId, Task>,
    ids: impl IntoIterator<Item = TaskId>,
) -> Vec<WorkflowStatus> {
    ids.into_iter()
        .filter_map(|id| tasks.get(&id).map(Task::status))
        .collect()
}

fn rederive_task(
    tasks: &mut BTreeMap<TaskId, Task>,
    graph: &BlockingGraph,
    id: TaskId,
    resolution: BlockerResolution,
    now: DateTime<Utc>,
) -> bool {
    let statuses = statuses_of(tasks, graph.blockers_of(id));
    let Some(task) = tasks.get_mut(&id) else {
        return false;
    };
    let derived = derive_status(task.status(), statuses, resolution);
    if derived == task.status() {
        return false;
    }
    task.apply_status(derived, now);
    true
}
