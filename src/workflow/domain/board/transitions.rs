//! State machine transitions and reviews on the board.

use super::{ProjectBoard, rederive_task};
use crate::workflow::domain::{
    Actor, ApprovalGate, ApprovalTally, HasReviews, HasStatus, Review, ReviewDecision, TaskId,
    TransitionGate, TransitionRejection, UserId, Version, WorkItemRef, WorkflowAction,
    WorkflowDomainError, WorkflowRules, WorkflowStatus, authorize_actor, cascade, derive_status,
    next_status,
};
use chrono::{DateTime, Utc};

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// Item that moved.
    pub item: WorkItemRef,
    /// Status before the transition.
    pub from: WorkflowStatus,
    /// Status after the transition.
    pub to: WorkflowStatus,
    /// Version after the transition.
    pub version: Version,
    /// Approval count checked by the gate, for gated transitions.
    pub tally: Option<ApprovalTally>,
    /// Dependents whose derived status changed as a consequence.
    pub rederived: Vec<TaskId>,
}

impl ProjectBoard {
    /// Applies `action` to a plan or task.
    ///
    /// Checks, in order: the caller's expected version, the actor, the state
    /// machine, then the transition's gate. Approval counts are read from
    /// the board at call time. When the move changes whether a task counts as
    /// resolved, its dependents are re-derived.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidTransition`] for illegal moves,
    /// [`WorkflowDomainError::InsufficientApprovals`] when the gate fails,
    /// and not-found or stale-version errors.
    pub fn transition(
        &mut self,
        item: WorkItemRef,
        action: WorkflowAction,
        actor: Actor,
        expected: Option<Version>,
        rules: WorkflowRules,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowDomainError> {
        let from = self.checked_status(item, expected)?;
        let reject = |reason: TransitionRejection| WorkflowDomainError::InvalidTransition {
            item,
            from,
            action,
            reason,
        };
        authorize_actor(action, actor).map_err(reject)?;
        let transition = next_status(item.kind(), from, action, rules.task_approval).map_err(reject)?;

        let tally = match transition.gate {
            TransitionGate::Open => None,
            TransitionGate::Unblocked => {
                if let WorkItemRef::Task(id) = item {
                    let status =
                        derive_status(from, self.blocker_statuses(id), rules.resolution);
                    if status == WorkflowStatus::Blocked {
                        return Err(reject(TransitionRejection::Blocked));
                    }
                }
                None
            }
            TransitionGate::Approvals => {
                let required = self.project.settings().required_approvals(item.kind());
                Some(ApprovalGate::authorize(&*self, item, required)?)
            }
        };

        let (to, version, rederived) = match item {
            WorkItemRef::Plan(id) => {
                let plan = self.plan_mut(id)?;
                plan.apply_status(transition.to, now);
                (transition.to, plan.version(), Vec::new())
            }
            WorkItemRef::Task(id) => self.move_task(id, from, transition.to, rules, now)?,
        };

        Ok(TransitionOutcome {
            item,
            from,
            to,
            version,
            tally,
            rederived,
        })
    }

    /// Records a review against an item in review.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::NotInReview`] when the target is not
    /// in review, and not-found errors for unknown targets.
    pub fn submit_review(
        &mut self,
        target: WorkItemRef,
        reviewer_id: UserId,
        decision: ReviewDecision,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&Review, WorkflowDomainError> {
        if self.checked_status(target, None)? != WorkflowStatus::Review {
            return Err(WorkflowDomainError::NotInReview(target));
        }
        let review = Review::new(target, reviewer_id, decision, comment, now);
        self.created_reviews.insert(review.id());
        self.reviews.push(review);
        self.reviews
            .last()
            .ok_or(WorkflowDomainError::NotInReview(target))
    }

    /// Counts approving reviews of `target` against its threshold.
    ///
    /// # Errors
    ///
    /// Returns not-found errors for unknown targets.
    pub fn approval_tally(&self, target: WorkItemRef) -> Result<ApprovalTally, WorkflowDomainError> {
        self.checked_status(target, None)?;
        let required = self.project.settings().required_approvals(target.kind());
        Ok(ApprovalGate::evaluate(self, target, required))
    }

    /// Returns the reviews of `target`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns not-found errors for unknown targets.
    pub fn reviews_for(&self, target: WorkItemRef) -> Result<Vec<&Review>, WorkflowDomainError> {
        self.checked_status(target, None)?;
        Ok(self.reviews_of(target))
    }

    fn checked_status(
        &self,
        item: WorkItemRef,
        expected: Option<Version>,
    ) -> Result<WorkflowStatus, WorkflowDomainError> {
        match item {
            WorkItemRef::Plan(id) => {
                let plan = self.require_plan(id)?;
                plan.ensure_version(expected)?;
                Ok(plan.status())
            }
            WorkItemRef::Task(id) => {
                let task = self.require_task(id)?;
                task.ensure_version(expected)?;
                Ok(task.status())
            }
        }
    }

    fn move_task(
        &mut self,
        id: TaskId,
        from: WorkflowStatus,
        target: WorkflowStatus,
        rules: WorkflowRules,
        now: DateTime<Utc>,
    ) -> Result<(WorkflowStatus, Version, Vec<TaskId>), WorkflowDomainError> {
        let to = if target.is_derivable() {
            derive_status(target, self.blocker_statuses(id), rules.resolution)
        } else {
            target
        };
        let task = self.task_mut(id)?;
        task.apply_status(to, now);
        let version = task.version();

        let resolution = rules.resolution;
        let rederived = if resolution.resolves(from) == resolution.resolves(to) {
            Vec::new()
        } else {
            let tasks = &mut self.tasks;
            let graph = &self.graph;
            cascade(graph, id, |dependent| {
                rederive_task(tasks, graph, dependent, resolution, now)
            })
        };
        Ok((to, version, rederived))
    }
}
