//! In-memory workflow repository for tests and embedded use.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::workflow::{
    domain::{
        BoardChanges, Plan, PlanId, Project, ProjectBoard, ProjectId, Review, Task, TaskId,
        Version, WorkItemRef,
    },
    ports::{WorkflowRepository, WorkflowRepositoryError, WorkflowRepositoryResult},
};

/// Thread-safe in-memory workflow repository.
///
/// Units of work hold the store's write lock for their whole duration, so
/// they are serialized across all projects.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkflowRepository {
    state: Arc<RwLock<InMemoryWorkflowState>>,
}

#[derive(Debug, Default)]
struct InMemoryWorkflowState {
    projects: HashMap<ProjectId, Project>,
    plans: HashMap<PlanId, Plan>,
    tasks: HashMap<TaskId, Task>,
    reviews: Vec<Review>,
}

impl InMemoryWorkflowRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> WorkflowRepositoryError {
    WorkflowRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

impl InMemoryWorkflowState {
    fn board(&self, project_id: ProjectId) -> WorkflowRepositoryResult<ProjectBoard> {
        let project = self
            .projects
            .get(&project_id)
            .cloned()
            .ok_or(WorkflowRepositoryError::ProjectNotFound(project_id))?;
        let plans: Vec<Plan> = self
            .plans
            .values()
            .filter(|plan| plan.project_id() == project_id)
            .cloned()
            .collect();
        let tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|task| task.project_id() == project_id)
            .cloned()
            .collect();
        let owned: HashSet<WorkItemRef> = plans
            .iter()
            .map(|plan| WorkItemRef::Plan(plan.id()))
            .chain(tasks.iter().map(|task| WorkItemRef::Task(task.id())))
            .collect();
        let reviews: Vec<Review> = self
            .reviews
            .iter()
            .filter(|review| owned.contains(&review.target()))
            .cloned()
            .collect();
        Ok(ProjectBoard::load(project, plans, tasks, reviews))
    }

    fn check_versions(&self, changes: &BoardChanges<'_>) -> WorkflowRepositoryResult<()> {
        for (plan, expected) in &changes.updated_plans {
            let stored = self.plans.get(&plan.id()).map(Plan::version);
            ensure_stored(stored, *expected, WorkItemRef::Plan(plan.id()))?;
        }
        for update in &changes.updated_tasks {
            let stored = self.tasks.get(&update.task.id()).map(Task::version);
            ensure_stored(stored, update.expected, WorkItemRef::Task(update.task.id()))?;
        }
        Ok(())
    }

    fn commit(&mut self, changes: &BoardChanges<'_>) {
        if let Some(project) = changes.project {
            self.projects.insert(project.id(), project.clone());
        }
        for plan in changes
            .created_plans
            .iter()
            .copied()
            .chain(changes.updated_plans.iter().map(|(plan, _)| *plan))
        {
            self.plans.insert(plan.id(), plan.clone());
        }
        for task in changes
            .created_tasks
            .iter()
            .copied()
            .chain(changes.updated_tasks.iter().map(|update| update.task))
        {
            self.tasks.insert(task.id(), task.clone());
        }
        for id in &changes.deleted_plans {
            self.plans.remove(id);
        }
        for id in &changes.deleted_tasks {
            self.tasks.remove(id);
        }
        let deleted = changes.deleted_items();
        self.reviews
            .retain(|review| !deleted.contains(&review.target()));
        self.reviews
            .extend(changes.created_reviews.iter().map(|review| (*review).clone()));
    }
}

fn ensure_stored(
    stored: Option<Version>,
    expected: Version,
    item: WorkItemRef,
) -> WorkflowRepositoryResult<()> {
    if stored == Some(expected) {
        Ok(())
    } else {
        Err(WorkflowRepositoryError::StaleVersion { item, expected })
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn store_project(&self, project: &Project) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.projects.contains_key(&project.id()) {
            return Err(WorkflowRepositoryError::DuplicateProject(project.id()));
        }
        state.projects.insert(project.id(), project.clone());
        Ok(())
    }

    async fn find_project(&self, id: ProjectId) -> WorkflowRepositoryResult<Option<Project>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.projects.get(&id).cloned())
    }

    async fn delete_project(&self, id: ProjectId) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.projects.remove(&id).is_none() {
            return Err(WorkflowRepositoryError::ProjectNotFound(id));
        }
        state.plans.retain(|_, plan| plan.project_id() != id);
        state.tasks.retain(|_, task| task.project_id() != id);
        let InMemoryWorkflowState {
            plans,
            tasks,
            reviews,
            ..
        } = &mut *state;
        reviews.retain(|review| match review.target() {
            WorkItemRef::Plan(plan_id) => plans.contains_key(&plan_id),
            WorkItemRef::Task(task_id) => tasks.contains_key(&task_id),
        });
        Ok(())
    }

    async fn locate(&self, item: WorkItemRef) -> WorkflowRepositoryResult<Option<ProjectId>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(match item {
            WorkItemRef::Plan(id) => state.plans.get(&id).map(Plan::project_id),
            WorkItemRef::Task(id) => state.tasks.get(&id).map(Task::project_id),
        })
    }

    async fn find_plan(&self, id: PlanId) -> WorkflowRepositoryResult<Option<Plan>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.plans.get(&id).cloned())
    }

    async fn find_task(&self, id: TaskId) -> WorkflowRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn load_board(&self, project_id: ProjectId) -> WorkflowRepositoryResult<ProjectBoard> {
        let state = self.state.read().map_err(poisoned)?;
        state.board(project_id)
    }

    async fn transact<T, E, F>(&self, project_id: ProjectId, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut ProjectBoard) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<WorkflowRepositoryError> + Send + 'static,
    {
        let mut state = self.state.write().map_err(poisoned)?;
        let mut board = state.board(project_id)?;
        let output = work(&mut board)?;

        let changes = board.changes();
        state.check_versions(&changes)?;
        state.commit(&changes);
        Ok(output)
    }
}
