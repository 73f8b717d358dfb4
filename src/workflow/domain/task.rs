//! Task aggregate root.

use super::{HasStatus, PlanId, ProjectId, TaskId, Title, Version, WorkItemRef, WorkflowStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Owning project.
    pub project_id: ProjectId,
    /// Plan the task belongs to, if any.
    pub plan_id: Option<PlanId>,
    /// Validated title.
    pub title: Title,
    /// Free-form description.
    pub description: Option<String>,
    /// Tasks that must resolve before this one can start.
    pub blocked_by: BTreeSet<TaskId>,
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    project_id: ProjectId,
    plan_id: Option<PlanId>,
    title: Title,
    description: Option<String>,
    status: WorkflowStatus,
    version: Version,
    blocked_by: BTreeSet<TaskId>,
    branch: Option<String>,
    worktree_path: Option<String>,
    session_started_at: Option<DateTime<Utc>>,
    session_ended_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted owning project.
    pub project_id: ProjectId,
    /// Persisted plan link.
    pub plan_id: Option<PlanId>,
    /// Persisted title.
    pub title: Title,
    /// Persisted description.
    pub description: Option<String>,
    /// Persisted workflow status.
    pub status: WorkflowStatus,
    /// Persisted version.
    pub version: Version,
    /// Persisted blocking edges.
    pub blocked_by: BTreeSet<TaskId>,
    /// Persisted branch name.
    pub branch: Option<String>,
    /// Persisted worktree path.
    pub worktree_path: Option<String>,
    /// Persisted session start.
    pub session_started_at: Option<DateTime<Utc>>,
    /// Persisted session end.
    pub session_ended_at: Option<DateTime<Utc>>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task at version 1 with an already derived initial status.
    pub(crate) fn create(input: NewTask, status: WorkflowStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::new(),
            project_id: input.project_id,
            plan_id: input.plan_id,
            title: input.title,
            description: input.description,
            status,
            version: Version::INITIAL,
            blocked_by: input.blocked_by,
            branch: None,
            worktree_path: None,
            session_started_at: None,
            session_ended_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            plan_id: data.plan_id,
            title: data.title,
            description: data.description,
            status: data.status,
            version: data.version,
            blocked_by: data.blocked_by,
            branch: data.branch,
            worktree_path: data.worktree_path,
            session_started_at: data.session_started_at,
            session_ended_at: data.session_ended_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the plan the task belongs to, if any.
    #[must_use]
    pub const fn plan_id(&self) -> Option<PlanId> {
        self.plan_id
    }

    /// Returns the title.
    #[must_use]
    pub const fn title(&self) -> &Title {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the workflow status.
    #[must_use]
    pub const fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Returns the optimistic concurrency version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Returns the tasks blocking this one.
    #[must_use]
    pub const fn blocked_by(&self) -> &BTreeSet<TaskId> {
        &self.blocked_by
    }

    /// Returns the branch name recorded by the session runner.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Returns the worktree path recorded by the session runner.
    #[must_use]
    pub fn worktree_path(&self) -> Option<&str> {
        self.worktree_path.as_deref()
    }

    /// Returns when the latest coding session started.
    #[must_use]
    pub const fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.session_started_at
    }

    /// Returns when the latest coding session ended.
    #[must_use]
    pub const fn session_ended_at(&self) -> Option<DateTime<Utc>> {
        self.session_ended_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replaces title and/or description. Returns whether anything changed.
    pub fn edit(
        &mut self,
        title: Option<Title>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if title.is_none() && description.is_none() {
            return false;
        }
        if let Some(new_title) = title {
            self.title = new_title;
        }
        if let Some(text) = description {
            self.description = Some(text);
        }
        self.touch(now);
        true
    }

    /// Records the branch and worktree chosen by the session runner.
    pub fn record_worktree(
        &mut self,
        branch: Option<String>,
        worktree_path: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.branch = branch;
        self.worktree_path = worktree_path;
        self.touch(now);
    }

    /// Replaces the blocker set and, when given, the derived status, as one
    /// mutation.
    pub(crate) fn replace_blockers(
        &mut self,
        blocked_by: BTreeSet<TaskId>,
        derived: Option<WorkflowStatus>,
        now: DateTime<Utc>,
    ) {
        self.blocked_by = blocked_by;
        if let Some(derived_status) = derived {
            self.status = derived_status;
        }
        self.touch(now);
    }

    /// Moves the task to `status`, stamping session timestamps when a coding
    /// session starts or ends.
    pub(crate) fn apply_status(&mut self, status: WorkflowStatus, now: DateTime<Utc>) {
        if status == WorkflowStatus::Coding {
            self.session_started_at = Some(now);
            self.session_ended_at = None;
        } else if self.status == WorkflowStatus::Coding {
            self.session_ended_at = Some(now);
        }
        self.status = status;
        self.touch(now);
    }

    /// Clears the plan link after the plan is deleted.
    pub(crate) fn detach_plan(&mut self, now: DateTime<Utc>) {
        self.plan_id = None;
        self.touch(now);
    }

    /// Bumps the version without other changes.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.version = self.version.next();
        self.updated_at = now;
    }
}

impl HasStatus for Task {
    fn item_ref(&self) -> WorkItemRef {
        WorkItemRef::Task(self.id)
    }

    fn status(&self) -> WorkflowStatus {
        Self::status(self)
    }

    fn version(&self) -> Version {
        Self::version(self)
    }
}
