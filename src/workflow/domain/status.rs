//! Workflow and processing status enumerations.

use super::{ParseProcessingStatusError, ParseWorkflowStatusError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by plans and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Ready to be picked up.
    Backlog,
    /// Waiting on unresolved blockers. Derived, never set directly.
    Blocked,
    /// A coding session is in progress.
    Coding,
    /// Awaiting reviewer decisions.
    Review,
    /// Reviews met the approval threshold.
    Approved,
    /// Running through CI/CD.
    Cicd,
    /// Merged into the main branch.
    Merged,
    /// Closed manually. Terminal.
    Closed,
}

impl WorkflowStatus {
    /// Every status in lifecycle order.
    pub const ALL: [Self; 8] = [
        Self::Backlog,
        Self::Blocked,
        Self::Coding,
        Self::Review,
        Self::Approved,
        Self::Cicd,
        Self::Merged,
        Self::Closed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Blocked => "blocked",
            Self::Coding => "coding",
            Self::Review => "review",
            Self::Approved => "approved",
            Self::Cicd => "cicd",
            Self::Merged => "merged",
            Self::Closed => "closed",
        }
    }

    /// Returns whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns whether status derivation may rewrite this status.
    #[must_use]
    pub const fn is_derivable(self) -> bool {
        matches!(self, Self::Backlog | Self::Blocked)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WorkflowStatus {
    type Error = ParseWorkflowStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "backlog" => Ok(Self::Backlog),
            "blocked" => Ok(Self::Blocked),
            "coding" => Ok(Self::Coding),
            "review" => Ok(Self::Review),
            "approved" => Ok(Self::Approved),
            "cicd" => Ok(Self::Cicd),
            "merged" => Ok(Self::Merged),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseWorkflowStatusError(value.to_owned())),
        }
    }
}

/// Progress of AI content generation for a plan.
///
/// Independent of [`WorkflowStatus`]: a plan in review may be generating,
/// and a completed generation says nothing about approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// No generation has been requested.
    #[default]
    Pending,
    /// A generation job is in flight.
    Generating,
    /// The last generation finished and its output was applied.
    Completed,
    /// The last generation failed or could not be submitted.
    Failed,
}

impl ProcessingStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProcessingStatus {
    type Error = ParseProcessingStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "generating" => Ok(Self::Generating),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseProcessingStatusError(value.to_owned())),
        }
    }
}
