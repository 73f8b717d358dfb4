//! Polymorphic references to plans and tasks.

use super::{
    ParseWorkItemKindError, Plan, PlanId, Task, TaskId, Version, WorkflowDomainError,
    WorkflowStatus,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work item a review or transition targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    /// A plan.
    Plan,
    /// A task.
    Task,
}

impl WorkItemKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Task => "task",
        }
    }
}

impl fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WorkItemKind {
    type Error = ParseWorkItemKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plan" => Ok(Self::Plan),
            "task" => Ok(Self::Task),
            _ => Err(ParseWorkItemKindError(value.to_owned())),
        }
    }
}

/// Tagged reference to either a plan or a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum WorkItemRef {
    /// Reference to a plan.
    Plan(PlanId),
    /// Reference to a task.
    Task(TaskId),
}

impl WorkItemRef {
    /// Returns the kind of the referenced item.
    #[must_use]
    pub const fn kind(self) -> WorkItemKind {
        match self {
            Self::Plan(_) => WorkItemKind::Plan,
            Self::Task(_) => WorkItemKind::Task,
        }
    }

    /// Returns the raw UUID of the referenced item.
    #[must_use]
    pub const fn uuid(self) -> uuid::Uuid {
        match self {
            Self::Plan(id) => id.into_inner(),
            Self::Task(id) => id.into_inner(),
        }
    }
}

impl From<PlanId> for WorkItemRef {
    fn from(value: PlanId) -> Self {
        Self::Plan(value)
    }
}

impl From<TaskId> for WorkItemRef {
    fn from(value: TaskId) -> Self {
        Self::Task(value)
    }
}

impl fmt::Display for WorkItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan(id) => write!(f, "plan {id}"),
            Self::Task(id) => write!(f, "task {id}"),
        }
    }
}

/// Read access to the workflow position of a plan or task.
pub trait HasStatus {
    /// Returns a tagged reference to the item.
    fn item_ref(&self) -> WorkItemRef;

    /// Returns the current workflow status.
    fn status(&self) -> WorkflowStatus;

    /// Returns the current optimistic concurrency version.
    fn version(&self) -> Version;

    /// Checks a caller-supplied version against the current one.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::StaleVersion`] when `expected` is set
    /// and differs from [`HasStatus::version`].
    fn ensure_version(&self, expected: Option<Version>) -> Result<(), WorkflowDomainError> {
        match expected {
            Some(expected) if expected != self.version() => {
                Err(WorkflowDomainError::StaleVersion {
                    item: self.item_ref(),
                    expected,
                    actual: self.version(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Owned plan or task, returned where either may be the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkItem {
    /// A plan.
    Plan(Plan),
    /// A task.
    Task(Task),
}

impl WorkItem {
    /// Returns the plan, if this is one.
    #[must_use]
    pub const fn as_plan(&self) -> Option<&Plan> {
        match self {
            Self::Plan(plan) => Some(plan),
            Self::Task(_) => None,
        }
    }

    /// Returns the task, if this is one.
    #[must_use]
    pub const fn as_task(&self) -> Option<&Task> {
        match self {
            Self::Task(task) => Some(task),
            Self::Plan(_) => None,
        }
    }
}

impl HasStatus for WorkItem {
    fn item_ref(&self) -> WorkItemRef {
        match self {
            Self::Plan(plan) => plan.item_ref(),
            Self::Task(task) => task.item_ref(),
        }
    }

    fn status(&self) -> WorkflowStatus {
        match self {
            Self::Plan(plan) => plan.status(),
            Self::Task(task) => task.status(),
        }
    }

    fn version(&self) -> Version {
        match self {
            Self::Plan(plan) => plan.version(),
            Self::Task(task) => task.version(),
        }
    }
}
