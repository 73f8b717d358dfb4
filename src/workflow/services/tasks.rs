//! Task creation, editing, blocking edges and queries.

use super::{
    WorkflowServiceError, WorkflowServiceResult,
    lookup::{ensure_owned_by, missing, owning_project},
};
use crate::workflow::{
    domain::{
        PlanId, ProjectId, Task, TaskDraft, TaskId, Title, Version, WorkItemRef, WorkflowRules,
        WorkflowStatus,
    },
    ports::{WorkflowRepository, WorkflowRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    project_id: ProjectId,
    title: String,
    description: Option<String>,
    plan_id: Option<PlanId>,
    blocked_by: Vec<TaskId>,
}

impl CreateTaskRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: None,
            plan_id: None,
            blocked_by: Vec::new(),
        }
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Places the task inside a plan.
    #[must_use]
    pub const fn with_plan(mut self, plan_id: PlanId) -> Self {
        self.plan_id = Some(plan_id);
        self
    }

    /// Sets the initial blockers.
    #[must_use]
    pub fn with_blockers(mut self, blocked_by: impl IntoIterator<Item = TaskId>) -> Self {
        self.blocked_by = blocked_by.into_iter().collect();
        self
    }
}

/// Partial edit of a plan or task.
///
/// `body` is the task description or the plan content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentEdit {
    title: Option<String>,
    body: Option<String>,
    expected: Option<Version>,
}

impl ContentEdit {
    /// Creates an empty edit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces the description or content.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Rejects the edit unless the item is still at `version`.
    #[must_use]
    pub const fn expecting(mut self, version: Version) -> Self {
        self.expected = Some(version);
        self
    }

    pub(super) fn into_parts(
        self,
    ) -> WorkflowServiceResult<(Option<Title>, Option<String>, Option<Version>)> {
        let title = self.title.map(Title::new).transpose()?;
        Ok((title, self.body, self.expected))
    }
}

/// Task orchestration service.
#[derive(Clone)]
pub struct TaskService<R, C>
where
    R: WorkflowRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    rules: WorkflowRules,
}

impl<R, C> TaskService<R, C>
where
    R: WorkflowRepository + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a task service with default workflow rules.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            rules: WorkflowRules::default(),
        }
    }

    /// Sets the workflow rules.
    #[must_use]
    pub const fn with_rules(mut self, rules: WorkflowRules) -> Self {
        self.rules = rules;
        self
    }

    /// Creates a task; its initial status is derived from its blockers.
    ///
    /// # Errors
    ///
    /// Returns not-found errors for unknown projects, plans or blockers,
    /// [`crate::workflow::domain::ErrorKind::CrossProject`] errors for plans
    /// or blockers of another project, and validation errors for bad titles.
    #[tracing::instrument(skip_all, fields(project_id = %request.project_id))]
    pub async fn create_task(&self, request: CreateTaskRequest) -> WorkflowServiceResult<Task> {
        let CreateTaskRequest {
            project_id,
            title,
            description,
            plan_id,
            blocked_by,
        } = request;

        let references = plan_id
            .map(WorkItemRef::Plan)
            .into_iter()
            .chain(blocked_by.iter().copied().map(WorkItemRef::Task));
        ensure_owned_by(&*self.repository, project_id, references).await?;

        let mut draft = TaskDraft::new(Title::new(title)?).with_blockers(blocked_by);
        if let Some(text) = description {
            draft = draft.with_description(text);
        }
        if let Some(id) = plan_id {
            draft = draft.with_plan(id);
        }

        let resolution = self.rules.resolution;
        let now = self.clock.utc();
        let task = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, WorkflowServiceError>(board.create_task(draft, resolution, now)?.clone())
            })
            .await?;
        tracing::info!(
            task_id = %task.id(),
            status = %task.status(),
            blockers = task.blocked_by().len(),
            "task created"
        );
        Ok(task)
    }

    /// Replaces a task's blockers.
    ///
    /// The whole candidate edge set is checked for cycles before anything is
    /// written; the task's status is re-derived in the same unit of work.
    ///
    /// # Errors
    ///
    /// Returns cycle, cross-project, not-found and stale-version errors.
    #[tracing::instrument(skip(self, blocked_by), fields(task_id = %task_id))]
    pub async fn set_blockers(
        &self,
        task_id: TaskId,
        blocked_by: Vec<TaskId>,
        expected: Option<Version>,
    ) -> WorkflowServiceResult<Task> {
        let project_id = owning_project(&*self.repository, WorkItemRef::Task(task_id)).await?;
        ensure_owned_by(
            &*self.repository,
            project_id,
            blocked_by.iter().copied().map(WorkItemRef::Task),
        )
        .await?;

        let resolution = self.rules.resolution;
        let now = self.clock.utc();
        let result = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, WorkflowServiceError>(
                    board
                        .set_blockers(task_id, blocked_by, expected, resolution, now)?
                        .clone(),
                )
            })
            .await;
        match result {
            Ok(task) => {
                tracing::info!(
                    task_id = %task_id,
                    status = %task.status(),
                    version = %task.version(),
                    blockers = task.blocked_by().len(),
                    "blockers replaced"
                );
                Ok(task)
            }
            Err(err) => {
                tracing::warn!(task_id = %task_id, error = %err, "blockers rejected");
                Err(err)
            }
        }
    }

    /// Edits a task's title or description.
    ///
    /// # Errors
    ///
    /// Returns validation, not-found and stale-version errors.
    #[tracing::instrument(skip(self, edit), fields(task_id = %task_id))]
    pub async fn update_task(&self, task_id: TaskId, edit: ContentEdit) -> WorkflowServiceResult<Task> {
        let (title, description, expected) = edit.into_parts()?;
        let project_id = owning_project(&*self.repository, WorkItemRef::Task(task_id)).await?;
        let now = self.clock.utc();
        let task = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, WorkflowServiceError>(
                    board
                        .update_task(task_id, title, description, expected, now)?
                        .clone(),
                )
            })
            .await?;
        tracing::info!(task_id = %task_id, version = %task.version(), "task updated");
        Ok(task)
    }

    /// Stores the branch and worktree chosen by the session runner.
    ///
    /// # Errors
    ///
    /// Returns not-found and stale-version errors.
    pub async fn record_worktree(
        &self,
        task_id: TaskId,
        branch: Option<String>,
        worktree_path: Option<String>,
        expected: Option<Version>,
    ) -> WorkflowServiceResult<Task> {
        let project_id = owning_project(&*self.repository, WorkItemRef::Task(task_id)).await?;
        let now = self.clock.utc();
        let task = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, WorkflowServiceError>(
                    board
                        .record_worktree(task_id, branch, worktree_path, expected, now)?
                        .clone(),
                )
            })
            .await?;
        tracing::debug!(task_id = %task_id, branch = task.branch(), "worktree recorded");
        Ok(task)
    }

    /// Deletes a task, detaching its child plan and re-deriving its former
    /// dependents. Returns those dependents.
    ///
    /// # Errors
    ///
    /// Returns not-found and stale-version errors.
    #[tracing::instrument(skip(self), fields(task_id = %task_id))]
    pub async fn delete_task(
        &self,
        task_id: TaskId,
        expected: Option<Version>,
    ) -> WorkflowServiceResult<Vec<TaskId>> {
        let project_id = owning_project(&*self.repository, WorkItemRef::Task(task_id)).await?;
        let resolution = self.rules.resolution;
        let now = self.clock.utc();
        let dependents = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, WorkflowServiceError>(board.delete_task(task_id, expected, resolution, now)?)
            })
            .await?;
        tracing::info!(task_id = %task_id, dependents = dependents.len(), "task deleted");
        Ok(dependents)
    }

    /// Retrieves a task.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown tasks.
    pub async fn get_task(&self, task_id: TaskId) -> WorkflowServiceResult<Task> {
        self.repository
            .find_task(task_id)
            .await?
            .ok_or_else(|| missing(WorkItemRef::Task(task_id)).into())
    }

    /// Lists a project's tasks, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown projects.
    pub async fn list_tasks(
        &self,
        project_id: ProjectId,
        status: Option<WorkflowStatus>,
    ) -> WorkflowServiceResult<Vec<Task>> {
        let board = self.repository.load_board(project_id).await?;
        Ok(board
            .tasks_with_status(status)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Returns the tasks blocking `task_id`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown tasks.
    pub async fn get_blockers(&self, task_id: TaskId) -> WorkflowServiceResult<Vec<Task>> {
        let board = self.board_of(task_id).await?;
        Ok(board
            .blockers_of(task_id)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Returns the tasks blocked by `task_id`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown tasks.
    pub async fn get_blocking(&self, task_id: TaskId) -> WorkflowServiceResult<Vec<Task>> {
        let board = self.board_of(task_id).await?;
        Ok(board
            .dependents_of(task_id)?
            .into_iter()
            .cloned()
            .collect())
    }

    async fn board_of(
        &self,
        task_id: TaskId,
    ) -> WorkflowServiceResult<crate::workflow::domain::ProjectBoard> {
        let project_id = owning_project(&*self.repository, WorkItemRef::Task(task_id)).await?;
        self.repository
            .load_board(project_id)
            .await
            .map_err(|err| match err {
                WorkflowRepositoryError::ProjectNotFound(_) => {
                    missing(WorkItemRef::Task(task_id)).into()
                }
                other => other.into(),
            })
    }
}
