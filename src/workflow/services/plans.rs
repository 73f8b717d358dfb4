//! Plan creation, spawning, editing and lineage queries.

use super::{
    ContentEdit, PlanTitleTemplate, WorkflowServiceError, WorkflowServiceResult,
    lookup::{ensure_owned_by, missing, owning_project},
};
use crate::workflow::{
    domain::{
        Plan, PlanDraft, PlanId, ProjectId, Task, TaskId, Title, UserId, Version, WorkItem,
        WorkItemRef, WorkflowStatus,
    },
    ports::WorkflowRepository,
};
use mockable::Clock;
use std::sync::Arc;

/// Request payload for creating a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePlanRequest {
    project_id: ProjectId,
    title: String,
    content: Option<String>,
    parent_task_id: Option<TaskId>,
    created_by: Option<UserId>,
}

impl CreatePlanRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            content: None,
            parent_task_id: None,
            created_by: None,
        }
    }

    /// Sets the initial content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Links the plan to the task it breaks down.
    #[must_use]
    pub const fn with_parent_task(mut self, task_id: TaskId) -> Self {
        self.parent_task_id = Some(task_id);
        self
    }

    /// Records the author.
    #[must_use]
    pub const fn with_author(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }
}

/// Plan orchestration service.
#[derive(Clone)]
pub struct PlanService<R, C>
where
    R: WorkflowRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    title_template: PlanTitleTemplate,
}

impl<R, C> PlanService<R, C>
where
    R: WorkflowRepository + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a plan service with the default spawn title.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            title_template: PlanTitleTemplate::default(),
        }
    }

    /// Sets the template used by [`PlanService::spawn_plan`].
    #[must_use]
    pub fn with_title_template(mut self, template: PlanTitleTemplate) -> Self {
        self.title_template = template;
        self
    }

    /// Creates a plan in backlog.
    ///
    /// # Errors
    ///
    /// Returns validation errors for bad titles, not-found and cross-project
    /// errors for the parent task, and a conflict when the parent task
    /// already has a plan.
    #[tracing::instrument(skip_all, fields(project_id = %request.project_id))]
    pub async fn create_plan(&self, request: CreatePlanRequest) -> WorkflowServiceResult<Plan> {
        let CreatePlanRequest {
            project_id,
            title,
            content,
            parent_task_id,
            created_by,
        } = request;
        ensure_owned_by(
            &*self.repository,
            project_id,
            parent_task_id.map(WorkItemRef::Task),
        )
        .await?;

        let mut draft = PlanDraft::new(Title::new(title)?);
        if let Some(text) = content {
            draft = draft.with_content(text);
        }
        if let Some(task_id) = parent_task_id {
            draft = draft.with_parent_task(task_id);
        }
        if let Some(user_id) = created_by {
            draft = draft.with_author(user_id);
        }

        let now = self.clock.utc();
        let plan = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, WorkflowServiceError>(board.create_plan(draft, now)?.clone())
            })
            .await?;
        tracing::info!(plan_id = %plan.id(), "plan created");
        Ok(plan)
    }

    /// Spawns a plan from a task, titled from the configured template and
    /// seeded with the task description.
    ///
    /// # Errors
    ///
    /// Returns a conflict when the task already has a plan, not-found errors,
    /// and template errors.
    #[tracing::instrument(skip(self), fields(task_id = %task_id))]
    pub async fn spawn_plan(&self, task_id: TaskId) -> WorkflowServiceResult<Plan> {
        let project_id = owning_project(&*self.repository, WorkItemRef::Task(task_id)).await?;
        let template = self.title_template.clone();
        let now = self.clock.utc();
        let plan = self
            .repository
            .transact(project_id, move |board| {
                let task = board
                    .task(task_id)
                    .ok_or_else(|| missing(WorkItemRef::Task(task_id)))?;
                let title = template.render(task)?;
                Ok::<_, WorkflowServiceError>(board.spawn_plan(task_id, move |_| title, now)?.clone())
            })
            .await?;
        tracing::info!(task_id = %task_id, plan_id = %plan.id(), "plan spawned");
        Ok(plan)
    }

    /// Edits a plan's title or content.
    ///
    /// # Errors
    ///
    /// Returns validation, not-found and stale-version errors.
    #[tracing::instrument(skip(self, edit), fields(plan_id = %plan_id))]
    pub async fn update_plan(&self, plan_id: PlanId, edit: ContentEdit) -> WorkflowServiceResult<Plan> {
        let (title, content, expected) = edit.into_parts()?;
        let project_id = owning_project(&*self.repository, WorkItemRef::Plan(plan_id)).await?;
        let now = self.clock.utc();
        let plan = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, WorkflowServiceError>(
                    board
                        .update_plan(plan_id, title, content, expected, now)?
                        .clone(),
                )
            })
            .await?;
        tracing::info!(plan_id = %plan_id, version = %plan.version(), "plan updated");
        Ok(plan)
    }

    /// Deletes a plan and detaches its tasks. Returns the detached tasks.
    ///
    /// # Errors
    ///
    /// Returns not-found and stale-version errors.
    #[tracing::instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn delete_plan(
        &self,
        plan_id: PlanId,
        expected: Option<Version>,
    ) -> WorkflowServiceResult<Vec<TaskId>> {
        let project_id = owning_project(&*self.repository, WorkItemRef::Plan(plan_id)).await?;
        let now = self.clock.utc();
        let detached = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, WorkflowServiceError>(board.delete_plan(plan_id, expected, now)?)
            })
            .await?;
        tracing::info!(plan_id = %plan_id, detached = detached.len(), "plan deleted");
        Ok(detached)
    }

    /// Retrieves a plan.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown plans.
    pub async fn get_plan(&self, plan_id: PlanId) -> WorkflowServiceResult<Plan> {
        self.repository
            .find_plan(plan_id)
            .await?
            .ok_or_else(|| missing(WorkItemRef::Plan(plan_id)).into())
    }

    /// Lists a project's plans, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown projects.
    pub async fn list_plans(
        &self,
        project_id: ProjectId,
        status: Option<WorkflowStatus>,
    ) -> WorkflowServiceResult<Vec<Plan>> {
        let board = self.repository.load_board(project_id).await?;
        Ok(board
            .plans_with_status(status)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Lists the tasks that belong to a plan, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown plans.
    pub async fn list_plan_tasks(&self, plan_id: PlanId) -> WorkflowServiceResult<Vec<Task>> {
        let project_id = owning_project(&*self.repository, WorkItemRef::Plan(plan_id)).await?;
        let board = self.repository.load_board(project_id).await?;
        Ok(board
            .tasks_of_plan(plan_id)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Returns the tasks and plans above `plan_id`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown plans and a cycle error when
    /// the stored parent links loop.
    pub async fn lineage(&self, plan_id: PlanId) -> WorkflowServiceResult<Vec<WorkItem>> {
        let project_id = owning_project(&*self.repository, WorkItemRef::Plan(plan_id)).await?;
        let board = self.repository.load_board(project_id).await?;
        Ok(board.lineage(plan_id)?)
    }
}
