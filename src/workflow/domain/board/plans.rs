//! Plan creation, spawning, editing, lineage and deletion.

use super::ProjectBoard;
use crate::workflow::domain::{
    HasStatus, NewPlan, Plan, PlanId, Task, TaskId, Title, UserId, Version, WorkItem, WorkItemRef,
    WorkflowDomainError, WorkflowStatus,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Input for creating a plan on a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanDraft {
    /// Validated title.
    pub title: Title,
    /// Initial content.
    pub content: Option<String>,
    /// Task that spawns the plan.
    pub parent_task_id: Option<TaskId>,
    /// Author of the plan.
    pub created_by: Option<UserId>,
}

impl PlanDraft {
    /// Creates a draft with only a title.
    #[must_use]
    pub const fn new(title: Title) -> Self {
        Self {
            title,
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

    /// Links the plan to the task that spawns it.
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

impl ProjectBoard {
    /// Creates a plan.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::TaskNotFound`] when the parent task is
    /// not on the board and [`WorkflowDomainError::PlanAlreadySpawned`] when
    /// it already has a child plan.
    pub fn create_plan(
        &mut self,
        draft: PlanDraft,
        now: DateTime<Utc>,
    ) -> Result<&Plan, WorkflowDomainError> {
        if let Some(task_id) = draft.parent_task_id {
            self.require_task(task_id)?;
            if let Some(existing) = self.child_plan_of(task_id) {
                return Err(WorkflowDomainError::PlanAlreadySpawned {
                    task_id,
                    plan_id: existing.id(),
                });
            }
        }

        let plan = Plan::new(
            NewPlan {
                project_id: self.project.id(),
                title: draft.title,
                content: draft.content,
                parent_task_id: draft.parent_task_id,
                created_by: draft.created_by,
            },
            now,
        );
        let id = plan.id();
        self.plans.insert(id, plan);
        self.require_plan(id)
    }

    /// Spawns a child plan from a task.
    ///
    /// The title comes from `name` applied to the task and is cut to the
    /// title limit; the content is the task description.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::PlanAlreadySpawned`] when the task
    /// already has a child plan, and not-found or title errors otherwise.
    pub fn spawn_plan<F>(
        &mut self,
        task_id: TaskId,
        name: F,
        now: DateTime<Utc>,
    ) -> Result<&Plan, WorkflowDomainError>
    where
        F: FnOnce(&Task) -> String,
    {
        let task = self.require_task(task_id)?;
        let title = Title::truncated(name(task))?;
        let mut draft = PlanDraft::new(title).with_parent_task(task_id);
        draft.content = task.description().map(str::to_owned);
        self.create_plan(draft, now)
    }

    /// Returns the plan spawned by `task_id`, if any.
    #[must_use]
    pub fn child_plan_of(&self, task_id: TaskId) -> Option<&Plan> {
        self.plans
            .values()
            .find(|plan| plan.parent_task_id() == Some(task_id))
    }

    /// Edits a plan's title and/or content.
    ///
    /// # Errors
    ///
    /// Returns not-found or stale-version errors.
    pub fn update_plan(
        &mut self,
        plan_id: PlanId,
        title: Option<Title>,
        content: Option<String>,
        expected: Option<Version>,
        now: DateTime<Utc>,
    ) -> Result<&Plan, WorkflowDomainError> {
        let plan = self.plan_mut(plan_id)?;
        plan.ensure_version(expected)?;
        plan.edit(title, content, now);
        Ok(plan)
    }

    /// Deletes a plan, removing its reviews and detaching its tasks.
    ///
    /// Returns the detached tasks.
    ///
    /// # Errors
    ///
    /// Returns not-found or stale-version errors.
    pub fn delete_plan(
        &mut self,
        plan_id: PlanId,
        expected: Option<Version>,
        now: DateTime<Utc>,
    ) -> Result<Vec<TaskId>, WorkflowDomainError> {
        self.require_plan(plan_id)?.ensure_version(expected)?;

        self.drop_reviews_of(WorkItemRef::Plan(plan_id));
        let mut detached = Vec::new();
        for task in self.tasks.values_mut() {
            if task.plan_id() == Some(plan_id) {
                task.detach_plan(now);
                detached.push(task.id());
            }
        }

        self.plans.remove(&plan_id);
        if self.baseline.plans.contains_key(&plan_id) {
            self.deleted_plans.insert(plan_id);
        }
        Ok(detached)
    }

    /// Walks the parent-task / owning-plan chain upwards from a plan,
    /// nearest ancestor first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::PlanNotFound`] for unknown plans and
    /// [`WorkflowDomainError::LineageCycle`] when the chain revisits an
    /// item.
    pub fn lineage(&self, plan_id: PlanId) -> Result<Vec<WorkItem>, WorkflowDomainError> {
        let origin = self.require_plan(plan_id)?;
        let mut seen: HashSet<WorkItemRef> = HashSet::from([origin.item_ref()]);
        let mut ancestry = Vec::new();
        let mut next_task = origin.parent_task_id();

        while let Some(task) = next_task.and_then(|id| self.tasks.get(&id)) {
            if !seen.insert(task.item_ref()) {
                return Err(WorkflowDomainError::LineageCycle(origin.item_ref()));
            }
            ancestry.push(WorkItem::Task(task.clone()));

            let Some(plan) = task.plan_id().and_then(|id| self.plans.get(&id)) else {
                break;
            };
            if !seen.insert(plan.item_ref()) {
                return Err(WorkflowDomainError::LineageCycle(origin.item_ref()));
            }
            ancestry.push(WorkItem::Plan(plan.clone()));
            next_task = plan.parent_task_id();
        }
        Ok(ancestry)
    }

    /// Returns the tasks that belong to `plan_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::PlanNotFound`] for unknown plans.
    pub fn tasks_of_plan(&self, plan_id: PlanId) -> Result<Vec<&Task>, WorkflowDomainError> {
        self.require_plan(plan_id)?;
        let mut tasks: Vec<&Task> = self
            .tasks
            .values()
            .filter(|task| task.plan_id() == Some(plan_id))
            .collect();
        tasks.sort_by_key(|task| (task.created_at(), task.id()));
        Ok(tasks)
    }

    /// Returns plans, optionally filtered by status.
    #[must_use]
    pub fn plans_with_status(&self, status: Option<WorkflowStatus>) -> Vec<&Plan> {
        self.plans
            .values()
            .filter(|plan| status.is_none_or(|wanted| plan.status() == wanted))
            .collect()
    }
}
