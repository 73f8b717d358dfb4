//! Error types for workflow domain rules and parsing.

use super::{
    GenerationKind, PlanId, TaskId, TransitionRejection, Version, WorkItemRef, WorkflowAction,
    WorkflowStatus,
};
use thiserror::Error;

/// Coarse error classification shared by every layer.
///
/// Callers map these onto their protocol (HTTP status codes, exit codes and
/// so on) without matching on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// A guard failed, a version was stale, or work is already in flight.
    Conflict,
    /// The blocking graph would no longer be acyclic.
    Cycle,
    /// Entities from different projects were combined.
    CrossProject,
    /// A required collaborator is not configured.
    Unavailable,
    /// The job queue rejected a submission; retrying may succeed.
    TransientQueue,
    /// Persistence or infrastructure failure.
    Internal,
}

impl ErrorKind {
    /// Returns whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransientQueue)
    }
}

/// Errors raised by workflow domain rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowDomainError {
    /// A title is empty after trimming.
    #[error("title must not be empty")]
    EmptyTitle,

    /// A title exceeds the storage limit.
    #[error("title is {length} characters long, exceeding the limit of {max}")]
    TitleTooLong {
        /// Character count of the rejected title.
        length: usize,
        /// Maximum accepted character count.
        max: usize,
    },

    /// A project name is empty after trimming.
    #[error("project name must not be empty")]
    EmptyProjectName,

    /// An approval threshold is below one.
    #[error("approval threshold must be at least 1, got {0}")]
    InvalidApprovalThreshold(u32),

    /// A task does not exist on the board.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// A plan does not exist on the board.
    #[error("plan not found: {0}")]
    PlanNotFound(PlanId),

    /// A referenced work item belongs to a different project.
    #[error("{0} belongs to a different project")]
    CrossProject(WorkItemRef),

    /// Replacing blockers would close a cycle in the blocking graph.
    #[error("blocking cycle detected: {}", format_cycle(.path))]
    BlockingCycle {
        /// Task ids along the cycle, starting and ending with the same task.
        path: Vec<TaskId>,
    },

    /// The state machine rejected an action.
    #[error("cannot {action} {item} while {from}: {reason}")]
    InvalidTransition {
        /// Target of the action.
        item: WorkItemRef,
        /// Status at decision time.
        from: WorkflowStatus,
        /// Rejected action.
        action: WorkflowAction,
        /// Why the action was rejected.
        reason: TransitionRejection,
    },

    /// The approval gate did not pass.
    #[error("Insufficient approvals: {approved}/{required}")]
    InsufficientApprovals {
        /// Approving reviews counted at decision time.
        approved: u32,
        /// Threshold configured for the project.
        required: u32,
    },

    /// Reviews are only accepted while the target is in review.
    #[error("{0} is not in review state")]
    NotInReview(WorkItemRef),

    /// The caller's expected version does not match the stored version.
    #[error("stale version for {item}: expected {expected}, found {actual}")]
    StaleVersion {
        /// Target of the write.
        item: WorkItemRef,
        /// Version supplied by the caller.
        expected: Version,
        /// Version currently stored.
        actual: Version,
    },

    /// The task already spawned a child plan.
    #[error("task {task_id} already spawned plan {plan_id}")]
    PlanAlreadySpawned {
        /// Parent task.
        task_id: TaskId,
        /// Existing child plan.
        plan_id: PlanId,
    },

    /// The plan/task ancestry loops back on itself.
    #[error("lineage of {0} loops back to an ancestor")]
    LineageCycle(WorkItemRef),

    /// A generation job for the plan is already running.
    #[error("generation already in progress for plan {0}")]
    GenerationInFlight(PlanId),

    /// The plan has no generation job to cancel.
    #[error("plan {0} is not generating")]
    NotGenerating(PlanId),

    /// Generation is not allowed for closed plans.
    #[error("plan {0} is closed")]
    PlanClosed(PlanId),

    /// Task breakdown requires an approved plan.
    #[error("plan {0} must be approved before it can be broken down into tasks")]
    PlanNotApproved(PlanId),

    /// Task breakdown requires plan content.
    #[error("plan {0} has no content to break down")]
    PlanHasNoContent(PlanId),

    /// A generation result does not match the kind of the running job.
    #[error("plan {plan_id} is running a {expected} job, received a {actual} result")]
    GenerationKindMismatch {
        /// Plan receiving the result.
        plan_id: PlanId,
        /// Kind recorded for the active run.
        expected: GenerationKind,
        /// Kind implied by the result.
        actual: GenerationKind,
    },
}

impl WorkflowDomainError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyTitle
            | Self::TitleTooLong { .. }
            | Self::EmptyProjectName
            | Self::InvalidApprovalThreshold(_)
            | Self::GenerationKindMismatch { .. } => ErrorKind::Validation,
            Self::TaskNotFound(_) | Self::PlanNotFound(_) => ErrorKind::NotFound,
            Self::CrossProject(_) => ErrorKind::CrossProject,
            Self::BlockingCycle { .. } | Self::LineageCycle(_) => ErrorKind::Cycle,
            Self::InvalidTransition { .. }
            | Self::InsufficientApprovals { .. }
            | Self::NotInReview(_)
            | Self::StaleVersion { .. }
            | Self::PlanAlreadySpawned { .. }
            | Self::GenerationInFlight(_)
            | Self::NotGenerating(_)
            | Self::PlanClosed(_)
            | Self::PlanNotApproved(_)
            | Self::PlanHasNoContent(_) => ErrorKind::Conflict,
        }
    }
}

fn format_cycle(path: &[TaskId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Error returned while parsing workflow statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown workflow status: {0}")]
pub struct ParseWorkflowStatusError(pub String);

/// Error returned while parsing processing statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown processing status: {0}")]
pub struct ParseProcessingStatusError(pub String);

/// Error returned while parsing review decisions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown review decision: {0}")]
pub struct ParseReviewDecisionError(pub String);

/// Error returned while parsing generation kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown generation kind: {0}")]
pub struct ParseGenerationKindError(pub String);

/// Error returned while parsing work item kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown work item kind: {0}")]
pub struct ParseWorkItemKindError(pub String);
