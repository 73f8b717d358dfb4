//! Task creation, editing, blocking edges and deletion.

use super::{ProjectBoard, statuses_of};
use crate::workflow::domain::{
    BlockerResolution, HasStatus, NewTask, PlanId, Task, TaskId, Title, Version, WorkItemRef,
    WorkflowDomainError, WorkflowStatus, derive_status,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Input for creating a task on a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Validated title.
    pub title: Title,
    /// Free-form description.
    pub description: Option<String>,
    /// Plan the task belongs to.
    pub plan_id: Option<PlanId>,
    /// Blocking tasks; duplicates are ignored.
    pub blocked_by: Vec<TaskId>,
}

impl TaskDraft {
    /// Creates a draft with only a title.
    #[must_use]
    pub const fn new(title: Title) -> Self {
        Self {
            title,
            description: None,
            plan_id: None,
            blocked_by: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches the task to a plan.
    #[must_use]
    pub const fn with_plan(mut self, plan_id: PlanId) -> Self {
        self.plan_id = Some(plan_id);
        self
    }

    /// Sets the blocking tasks.
    #[must_use]
    pub fn with_blockers(mut self, blocked_by: impl IntoIterator<Item = TaskId>) -> Self {
        self.blocked_by = blocked_by.into_iter().collect();
        self
    }
}

impl ProjectBoard {
    /// Creates a task and derives its initial status from its blockers.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the plan or a blocker is not on the
    /// board.
    pub fn create_task(
        &mut self,
        draft: TaskDraft,
        resolution: BlockerResolution,
        now: DateTime<Utc>,
    ) -> Result<&Task, WorkflowDomainError> {
        if let Some(plan_id) = draft.plan_id {
            self.require_plan(plan_id)?;
        }
        let blocked_by: BTreeSet<TaskId> = draft.blocked_by.into_iter().collect();
        for &blocker in &blocked_by {
            self.require_task(blocker)?;
        }

        let status = derive_status(
            WorkflowStatus::Backlog,
            statuses_of(&self.tasks, blocked_by.iter().copied()),
            resolution,
        );
        let task = Task::create(
            NewTask {
                project_id: self.project.id(),
                plan_id: draft.plan_id,
                title: draft.title,
                description: draft.description,
                blocked_by: blocked_by.clone(),
            },
            status,
            now,
        );
        let id = task.id();
        self.graph.replace_blockers(id, blocked_by);
        self.tasks.insert(id, task);
        self.require_task(id)
    }

    /// Replaces the blockers of a task and re-derives its status.
    ///
    /// The edge change and any status flip are one mutation: the version
    /// increases by exactly one.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::BlockingCycle`] when the new edges
    /// would close a loop (including a self-loop), a stale-version error when
    /// `expected` is outdated, and not-found errors for unknown ids.
    pub fn set_blockers(
        &mut self,
        task_id: TaskId,
        blocked_by: impl IntoIterator<Item = TaskId>,
        expected: Option<Version>,
        resolution: BlockerResolution,
        now: DateTime<Utc>,
    ) -> Result<&Task, WorkflowDomainError> {
        let current = {
            let task = self.require_task(task_id)?;
            task.ensure_version(expected)?;
            task.status()
        };
        let candidate: BTreeSet<TaskId> = blocked_by.into_iter().collect();
        for &blocker in &candidate {
            if blocker != task_id {
                self.require_task(blocker)?;
            }
        }
        self.graph.validate_replacement(task_id, &candidate)?;

        let derived = derive_status(
            current,
            statuses_of(&self.tasks, candidate.iter().copied()),
            resolution,
        );
        self.graph.replace_blockers(task_id, candidate.clone());
        let task = self.task_mut(task_id)?;
        task.replace_blockers(candidate, (derived != current).then_some(derived), now);
        Ok(task)
    }

    /// Edits a task's title and/or description.
    ///
    /// # Errors
    ///
    /// Returns not-found or stale-version errors.
    pub fn update_task(
        &mut self,
        task_id: TaskId,
        title: Option<Title>,
        description: Option<String>,
        expected: Option<Version>,
        now: DateTime<Utc>,
    ) -> Result<&Task, WorkflowDomainError> {
        let task = self.task_mut(task_id)?;
        task.ensure_version(expected)?;
        task.edit(title, description, now);
        Ok(task)
    }

    /// Stores the branch and worktree reported by the session runner.
    ///
    /// # Errors
    ///
    /// Returns not-found or stale-version errors.
    pub fn record_worktree(
        &mut self,
        task_id: TaskId,
        branch: Option<String>,
        worktree_path: Option<String>,
        expected: Option<Version>,
        now: DateTime<Utc>,
    ) -> Result<&Task, WorkflowDomainError> {
        let task = self.task_mut(task_id)?;
        task.ensure_version(expected)?;
        task.record_worktree(branch, worktree_path, now);
        Ok(task)
    }

    /// Deletes a task with everything it owns.
    ///
    /// Edges in both directions and the task's reviews are removed, a
    /// spawned plan is detached, and every former dependent is re-derived.
    /// Returns the former dependents.
    ///
    /// # Errors
    ///
    /// Returns not-found or stale-version errors.
    pub fn delete_task(
        &mut self,
        task_id: TaskId,
        expected: Option<Version>,
        resolution: BlockerResolution,
        now: DateTime<Utc>,
    ) -> Result<Vec<TaskId>, WorkflowDomainError> {
        self.require_task(task_id)?.ensure_version(expected)?;

        self.drop_reviews_of(WorkItemRef::Task(task_id));
        for plan in self.plans.values_mut() {
            if plan.parent_task_id() == Some(task_id) {
                plan.detach_parent(now);
            }
        }

        let former = self.graph.remove_task(task_id);
        self.tasks.remove(&task_id);
        if self.baseline.tasks.contains_key(&task_id) {
            self.deleted_tasks.insert(task_id);
        }

        for &dependent in &former {
            let remaining: BTreeSet<TaskId> = self.graph.blockers_of(dependent).collect();
            let statuses = statuses_of(&self.tasks, remaining.iter().copied());
            if let Some(task) = self.tasks.get_mut(&dependent) {
                let current = task.status();
                let derived = derive_status(current, statuses, resolution);
                task.replace_blockers(remaining, (derived != current).then_some(derived), now);
            }
        }
        Ok(former.into_iter().collect())
    }

    /// Returns the tasks blocking `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::TaskNotFound`] for unknown tasks.
    pub fn blockers_of(&self, task_id: TaskId) -> Result<Vec<&Task>, WorkflowDomainError> {
        self.require_task(task_id)?;
        Ok(self
            .graph
            .blockers_of(task_id)
            .filter_map(|id| self.tasks.get(&id))
            .collect())
    }

    /// Returns the tasks blocked by `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::TaskNotFound`] for unknown tasks.
    pub fn dependents_of(&self, task_id: TaskId) -> Result<Vec<&Task>, WorkflowDomainError> {
        self.require_task(task_id)?;
        Ok(self
            .graph
            .dependents_of(task_id)
            .filter_map(|id| self.tasks.get(&id))
            .collect())
    }

    /// Returns tasks, optionally filtered by status.
    #[must_use]
    pub fn tasks_with_status(&self, status: Option<WorkflowStatus>) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|task| status.is_none_or(|wanted| task.status() == wanted))
            .collect()
    }
}
