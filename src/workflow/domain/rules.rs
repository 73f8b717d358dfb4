//! Configurable workflow policies.

use super::WorkflowStatus;
use serde::{Deserialize, Serialize};

/// Which blocker statuses count as resolved for status derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerResolution {
    /// Merged and closed blockers both release their dependents.
    #[default]
    MergedOrClosed,
    /// Only merged blockers release their dependents; a closed blocker keeps
    /// blocking until the edge is removed.
    MergedOnly,
}

impl BlockerResolution {
    /// Returns whether a blocker in `status` no longer blocks its dependents.
    #[must_use]
    pub const fn resolves(self, status: WorkflowStatus) -> bool {
        match self {
            Self::MergedOrClosed => matches!(status, WorkflowStatus::Merged | WorkflowStatus::Closed),
            Self::MergedOnly => matches!(status, WorkflowStatus::Merged),
        }
    }
}

/// How the approve action moves a task out of review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskApprovalMode {
    /// `review -> cicd` in one gated step.
    #[default]
    Direct,
    /// `review -> approved`, then a second approve performs `approved -> cicd`.
    Staged,
}

/// Policies consulted by board operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowRules {
    /// Blocker resolution policy.
    pub resolution: BlockerResolution,
    /// Task approval mode.
    pub task_approval: TaskApprovalMode,
}

impl WorkflowRules {
    /// Creates rules from both policies.
    #[must_use]
    pub const fn new(resolution: BlockerResolution, task_approval: TaskApprovalMode) -> Self {
        Self {
            resolution,
            task_approval,
        }
    }
}
