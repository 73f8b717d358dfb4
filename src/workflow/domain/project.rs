//! Project aggregate and per-project workflow settings.

use super::{HatId, ProjectId, WorkItemKind, WorkflowDomainError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Number of approving reviews required to pass the approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ApprovalThreshold(u32);

impl ApprovalThreshold {
    /// Threshold applied when a project does not configure one.
    pub const DEFAULT: Self = Self(1);

    /// Validates a threshold.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidApprovalThreshold`] when
    /// `value` is zero.
    pub const fn new(value: u32) -> Result<Self, WorkflowDomainError> {
        if value == 0 {
            return Err(WorkflowDomainError::InvalidApprovalThreshold(value));
        }
        Ok(Self(value))
    }

    /// Returns the numeric threshold.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Default for ApprovalThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for ApprovalThreshold {
    type Error = WorkflowDomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApprovalThreshold> for u32 {
    fn from(value: ApprovalThreshold) -> Self {
        value.0
    }
}

/// Workflow settings owned one-to-one by a project.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Approvals required to move a plan out of review.
    pub required_approvals_plan: ApprovalThreshold,
    /// Approvals required to move a task out of review.
    pub required_approvals_task: ApprovalThreshold,
    /// Stored for external collaborators; not interpreted by the engine.
    pub auto_approve_main_updates: bool,
    /// Reviewer hats assigned to the project.
    pub assigned_hats: BTreeSet<HatId>,
}

impl ProjectSettings {
    /// Creates settings with explicit thresholds and default flags.
    #[must_use]
    pub fn with_thresholds(plan: ApprovalThreshold, task: ApprovalThreshold) -> Self {
        Self {
            required_approvals_plan: plan,
            required_approvals_task: task,
            ..Self::default()
        }
    }

    /// Returns the threshold for the given kind of work item.
    #[must_use]
    pub const fn required_approvals(&self, kind: WorkItemKind) -> ApprovalThreshold {
        match kind {
            WorkItemKind::Plan => self.required_approvals_plan,
            WorkItemKind::Task => self.required_approvals_task,
        }
    }
}

/// Project aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    name: String,
    settings: ProjectSettings,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedProjectData {
    /// Persisted project identifier.
    pub id: ProjectId,
    /// Persisted display name.
    pub name: String,
    /// Persisted settings row.
    pub settings: ProjectSettings,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates a new project.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyProjectName`] when the trimmed
    /// name is empty.
    pub fn new(
        name: impl AsRef<str>,
        settings: ProjectSettings,
        now: DateTime<Utc>,
    ) -> Result<Self, WorkflowDomainError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(WorkflowDomainError::EmptyProjectName);
        }
        Ok(Self {
            id: ProjectId::new(),
            name: trimmed.to_owned(),
            settings,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstructs a project from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedProjectData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            settings: data.settings,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the project identifier.
    #[must_use]
    pub const fn id(&self) -> ProjectId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the workflow settings.
    #[must_use]
    pub const fn settings(&self) -> &ProjectSettings {
        &self.settings
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

    /// Replaces the workflow settings.
    pub fn replace_settings(&mut self, settings: ProjectSettings, now: DateTime<Utc>) {
        self.settings = settings;
        self.updated_at = now;
    }
}
