//! Workflow state machine.
//!
//! Transition legality is a single pure function, [`next_status`], over the
//! target kind, the current status, the requested action and the configured
//! task approval mode. Guards that need more context (unresolved blockers,
//! approval counts, the acting party) are reported back as data so the board
//! can evaluate them inside the same transaction.

use super::{TaskApprovalMode, UserId, WorkItemKind, WorkflowStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action requested against a plan or task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    /// A coding session starts.
    StartSession,
    /// A coding session finishes normally.
    EndSession,
    /// A coding session is aborted.
    AbortSession,
    /// A reviewer asks to move the item past review.
    Approve,
    /// The CI pipeline reports success.
    CiSucceeded,
    /// The CI pipeline reports failure.
    CiFailed,
    /// The item is closed manually.
    Close,
}

impl WorkflowAction {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartSession => "start_session",
            Self::EndSession => "end_session",
            Self::AbortSession => "abort_session",
            Self::Approve => "approve",
            Self::CiSucceeded => "ci_succeeded",
            Self::CiFailed => "ci_failed",
            Self::Close => "close",
        }
    }

    /// Returns whether only the CI pipeline may request this action.
    #[must_use]
    pub const fn is_ci_signal(self) -> bool {
        matches!(self, Self::CiSucceeded | Self::CiFailed)
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Party requesting a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// A human user.
    User(UserId),
    /// The coding-session runner.
    SessionRunner,
    /// The CI pipeline.
    Ci,
    /// The engine itself or another trusted internal caller.
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user {id}"),
            Self::SessionRunner => f.write_str("session runner"),
            Self::Ci => f.write_str("ci"),
            Self::System => f.write_str("system"),
        }
    }
}

/// Extra condition a legal transition must satisfy before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionGate {
    /// No further condition.
    Open,
    /// Task must have no unresolved blockers.
    Unblocked,
    /// A fresh approval count must meet the project threshold.
    Approvals,
}

/// A legal move through the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    /// Status before the move.
    pub from: WorkflowStatus,
    /// Status after the move.
    pub to: WorkflowStatus,
    /// Condition checked before writing.
    pub gate: TransitionGate,
}

impl Transition {
    const fn new(from: WorkflowStatus, to: WorkflowStatus, gate: TransitionGate) -> Self {
        Self { from, to, gate }
    }
}

/// Why the state machine refused an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionRejection {
    /// The item is already closed.
    AlreadyClosed,
    /// The task still has unresolved blockers.
    Blocked,
    /// Approval requires the item to be in review.
    NotInReview,
    /// The action requires a different current status.
    RequiresStatus(WorkflowStatus),
    /// The action only applies to tasks.
    TaskOnly,
    /// The actor may not request this action.
    ActorNotPermitted,
}

impl fmt::Display for TransitionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyClosed => f.write_str("already closed"),
            Self::Blocked => f.write_str("task has unresolved blockers"),
            Self::NotInReview => f.write_str("not in review state"),
            Self::RequiresStatus(status) => write!(f, "requires status {status}"),
            Self::TaskOnly => f.write_str("action applies to tasks only"),
            Self::ActorNotPermitted => f.write_str("only the CI pipeline may report CI results"),
        }
    }
}

/// Checks that `actor` may request `action`.
///
/// # Errors
///
/// Returns [`TransitionRejection::ActorNotPermitted`] when a CI signal does
/// not come from [`Actor::Ci`].
pub const fn authorize_actor(
    action: WorkflowAction,
    actor: Actor,
) -> Result<(), TransitionRejection> {
    if action.is_ci_signal() && !matches!(actor, Actor::Ci) {
        return Err(TransitionRejection::ActorNotPermitted);
    }
    Ok(())
}

/// Resolves the transition `action` performs on an item of `kind` currently
/// in `from`.
///
/// `Blocked` is never a target: it is entered and left only through status
/// derivation.
///
/// # Errors
///
/// Returns the [`TransitionRejection`] describing the unmet precondition.
pub const fn next_status(
    kind: WorkItemKind,
    from: WorkflowStatus,
    action: WorkflowAction,
    mode: TaskApprovalMode,
) -> Result<Transition, TransitionRejection> {
    use TransitionGate::{Open, Unblocked};
    use WorkflowStatus as S;

    if matches!(from, S::Closed) {
        return Err(TransitionRejection::AlreadyClosed);
    }

    match action {
        WorkflowAction::Close => Ok(Transition::new(from, S::Closed, Open)),
        WorkflowAction::StartSession => match from {
            S::Backlog => Ok(Transition::new(from, S::Coding, Unblocked)),
            S::Blocked => Err(TransitionRejection::Blocked),
            _ => Err(TransitionRejection::RequiresStatus(S::Backlog)),
        },
        WorkflowAction::EndSession | WorkflowAction::AbortSession => match from {
            S::Coding => Ok(Transition::new(from, S::Review, Open)),
            _ => Err(TransitionRejection::RequiresStatus(S::Coding)),
        },
        WorkflowAction::Approve => approve(kind, from, mode),
        WorkflowAction::CiSucceeded | WorkflowAction::CiFailed => {
            if matches!(kind, WorkItemKind::Plan) {
                return Err(TransitionRejection::TaskOnly);
            }
            match (from, action) {
                (S::Cicd, WorkflowAction::CiSucceeded) => {
                    Ok(Transition::new(from, S::Merged, Open))
                }
                (S::Cicd, _) => Ok(Transition::new(from, S::Backlog, Open)),
                _ => Err(TransitionRejection::RequiresStatus(S::Cicd)),
            }
        }
    }
}

const fn approve(
    kind: WorkItemKind,
    from: WorkflowStatus,
    mode: TaskApprovalMode,
) -> Result<Transition, TransitionRejection> {
    use TransitionGate::Approvals;
    use WorkflowStatus as S;

    match (kind, from, mode) {
        (WorkItemKind::Plan, S::Review, _)
        | (WorkItemKind::Task, S::Review, TaskApprovalMode::Staged) => {
            Ok(Transition::new(from, S::Approved, Approvals))
        }
        (WorkItemKind::Task, S::Review | S::Approved, _) => {
            Ok(Transition::new(from, S::Cicd, Approvals))
        }
        _ => Err(TransitionRejection::NotInReview),
    }
}
