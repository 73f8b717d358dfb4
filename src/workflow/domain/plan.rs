//! Plan aggregate and its generation bookkeeping.

use super::{
    GenerationRunId, HasStatus, ParseGenerationKindError, PlanId, ProcessingStatus, ProjectId,
    TaskId, Title, UserId, Version, WorkItemRef, WorkflowDomainError, WorkflowStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error text recorded when a generation job is cancelled.
pub const GENERATION_CANCELLED: &str = "generation cancelled";

/// Kind of AI generation job a plan can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    /// Generate markdown content from the plan title.
    PlanContent,
    /// Break approved plan content down into tasks.
    TaskBreakdown,
}

impl GenerationKind {
    /// Every job kind.
    pub const ALL: [Self; 2] = [Self::PlanContent, Self::TaskBreakdown];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlanContent => "plan_content",
            Self::TaskBreakdown => "task_breakdown",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for GenerationKind {
    type Error = ParseGenerationKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plan_content" => Ok(Self::PlanContent),
            "task_breakdown" => Ok(Self::TaskBreakdown),
            _ => Err(ParseGenerationKindError(value.to_owned())),
        }
    }
}

/// The generation job most recently accepted for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationRun {
    /// Run identifier carried in the job payload.
    pub id: GenerationRunId,
    /// Kind of job.
    pub kind: GenerationKind,
}

/// Input for creating a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlan {
    /// Owning project.
    pub project_id: ProjectId,
    /// Validated title.
    pub title: Title,
    /// Initial content, if any.
    pub content: Option<String>,
    /// Task that spawned the plan, if any.
    pub parent_task_id: Option<TaskId>,
    /// Author of the plan, if known.
    pub created_by: Option<UserId>,
}

/// Plan aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    id: PlanId,
    project_id: ProjectId,
    title: Title,
    content: Option<String>,
    status: WorkflowStatus,
    parent_task_id: Option<TaskId>,
    version: Version,
    processing_status: ProcessingStatus,
    processing_error: Option<String>,
    generation_run: Option<GenerationRun>,
    created_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPlanData {
    /// Persisted plan identifier.
    pub id: PlanId,
    /// Persisted owning project.
    pub project_id: ProjectId,
    /// Persisted title.
    pub title: Title,
    /// Persisted content.
    pub content: Option<String>,
    /// Persisted workflow status.
    pub status: WorkflowStatus,
    /// Persisted parent task.
    pub parent_task_id: Option<TaskId>,
    /// Persisted version.
    pub version: Version,
    /// Persisted processing status.
    pub processing_status: ProcessingStatus,
    /// Persisted processing error.
    pub processing_error: Option<String>,
    /// Persisted generation run.
    pub generation_run: Option<GenerationRun>,
    /// Persisted author.
    pub created_by: Option<UserId>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    /// Creates a plan in backlog with no generation history.
    #[must_use]
    pub fn new(input: NewPlan, now: DateTime<Utc>) -> Self {
        Self {
            id: PlanId::new(),
            project_id: input.project_id,
            title: input.title,
            content: input.content,
            status: WorkflowStatus::Backlog,
            parent_task_id: input.parent_task_id,
            version: Version::INITIAL,
            processing_status: ProcessingStatus::Pending,
            processing_error: None,
            generation_run: None,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs a plan from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedPlanData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            title: data.title,
            content: data.content,
            status: data.status,
            parent_task_id: data.parent_task_id,
            version: data.version,
            processing_status: data.processing_status,
            processing_error: data.processing_error,
            generation_run: data.generation_run,
            created_by: data.created_by,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the plan identifier.
    #[must_use]
    pub const fn id(&self) -> PlanId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the title.
    #[must_use]
    pub const fn title(&self) -> &Title {
        &self.title
    }

    /// Returns the content, if any.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
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

    /// Returns the task that spawned this plan, if any.
    #[must_use]
    pub const fn parent_task_id(&self) -> Option<TaskId> {
        self.parent_task_id
    }

    /// Returns the generation progress.
    #[must_use]
    pub const fn processing_status(&self) -> ProcessingStatus {
        self.processing_status
    }

    /// Returns the last generation error, if any.
    #[must_use]
    pub fn processing_error(&self) -> Option<&str> {
        self.processing_error.as_deref()
    }

    /// Returns the most recently accepted generation run, if any.
    #[must_use]
    pub const fn generation_run(&self) -> Option<GenerationRun> {
        self.generation_run
    }

    /// Returns the author, if known.
    #[must_use]
    pub const fn created_by(&self) -> Option<UserId> {
        self.created_by
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

    /// Returns whether `run` is the job the plan is currently waiting on.
    #[must_use]
    pub fn awaits_run(&self, run: GenerationRunId) -> bool {
        self.processing_status == ProcessingStatus::Generating
            && self.generation_run.is_some_and(|active| active.id == run)
    }

    /// Replaces title and/or content. Returns whether anything changed.
    pub fn edit(
        &mut self,
        title: Option<Title>,
        content: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if title.is_none() && content.is_none() {
            return false;
        }
        if let Some(new_title) = title {
            self.title = new_title;
        }
        if let Some(text) = content {
            self.content = Some(text);
        }
        self.touch(now);
        true
    }

    /// Claims the plan for a new generation job.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::PlanClosed`] for closed plans,
    /// [`WorkflowDomainError::GenerationInFlight`] while another job runs, and
    /// for task breakdowns [`WorkflowDomainError::PlanNotApproved`] or
    /// [`WorkflowDomainError::PlanHasNoContent`].
    pub fn begin_generation(
        &mut self,
        kind: GenerationKind,
        now: DateTime<Utc>,
    ) -> Result<GenerationRun, WorkflowDomainError> {
        if self.status.is_terminal() {
            return Err(WorkflowDomainError::PlanClosed(self.id));
        }
        if self.processing_status == ProcessingStatus::Generating {
            return Err(WorkflowDomainError::GenerationInFlight(self.id));
        }
        if kind == GenerationKind::TaskBreakdown {
            if self.status != WorkflowStatus::Approved {
                return Err(WorkflowDomainError::PlanNotApproved(self.id));
            }
            if self.content.as_deref().is_none_or(|text| text.trim().is_empty()) {
                return Err(WorkflowDomainError::PlanHasNoContent(self.id));
            }
        }

        let run = GenerationRun {
            id: GenerationRunId::new(),
            kind,
        };
        self.processing_status = ProcessingStatus::Generating;
        self.processing_error = None;
        self.generation_run = Some(run);
        self.touch(now);
        Ok(run)
    }

    /// Records a successful generation for the active run.
    ///
    /// `content` is set for plan-content jobs; task breakdowns leave the
    /// content untouched. The caller must have checked [`Plan::awaits_run`].
    pub(crate) fn complete_generation(&mut self, content: Option<String>, now: DateTime<Utc>) {
        if let Some(text) = content {
            self.content = Some(text);
        }
        self.processing_status = ProcessingStatus::Completed;
        self.processing_error = None;
        self.touch(now);
    }

    /// Records a failed generation for the active run. Content is kept.
    pub(crate) fn fail_generation(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.processing_status = ProcessingStatus::Failed;
        self.processing_error = Some(error.into());
        self.touch(now);
    }

    /// Marks an in-flight generation as cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::NotGenerating`] when no job is running.
    pub fn cancel_generation(&mut self, now: DateTime<Utc>) -> Result<(), WorkflowDomainError> {
        if self.processing_status != ProcessingStatus::Generating {
            return Err(WorkflowDomainError::NotGenerating(self.id));
        }
        self.fail_generation(GENERATION_CANCELLED, now);
        Ok(())
    }

    /// Clears the parent task link after the task is deleted.
    pub(crate) fn detach_parent(&mut self, now: DateTime<Utc>) {
        self.parent_task_id = None;
        self.touch(now);
    }

    /// Moves the plan to `status`.
    ///
    /// Reaching a terminal status cancels an in-flight job within the same
    /// version bump, so its late result is ignored.
    pub(crate) fn apply_status(&mut self, status: WorkflowStatus, now: DateTime<Utc>) {
        self.status = status;
        if status.is_terminal() && self.processing_status == ProcessingStatus::Generating {
            self.processing_status = ProcessingStatus::Failed;
            self.processing_error = Some(GENERATION_CANCELLED.to_owned());
        }
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.version = self.version.next();
        self.updated_at = now;
    }
}

impl HasStatus for Plan {
    fn item_ref(&self) -> WorkItemRef {
        WorkItemRef::Plan(self.id)
    }

    fn status(&self) -> WorkflowStatus {
        Self::status(self)
    }

    fn version(&self) -> Version {
        Self::version(self)
    }
}
