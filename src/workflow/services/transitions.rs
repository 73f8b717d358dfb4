//! Workflow transitions, reviews and approval tallies.

use super::{WorkflowServiceError, WorkflowServiceResult, lookup::owning_project};
use crate::workflow::{
    domain::{
        Actor, ApprovalTally, ErrorKind, Review, ReviewDecision, TransitionOutcome, UserId,
        Version, WorkItem, WorkItemRef, WorkflowAction, WorkflowRules,
    },
    ports::WorkflowRepository,
};
use mockable::Clock;
use std::sync::Arc;

/// Request payload for a workflow transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRequest {
    item: WorkItemRef,
    action: WorkflowAction,
    actor: Actor,
    expected: Option<Version>,
}

impl TransitionRequest {
    /// Creates a request without a version precondition.
    #[must_use]
    pub const fn new(item: WorkItemRef, action: WorkflowAction, actor: Actor) -> Self {
        Self {
            item,
            action,
            actor,
            expected: None,
        }
    }

    /// Rejects the transition unless the item is still at `version`.
    #[must_use]
    pub const fn expecting(mut self, version: Version) -> Self {
        self.expected = Some(version);
        self
    }
}

/// Request payload for recording a review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReviewRequest {
    target: WorkItemRef,
    reviewer_id: UserId,
    decision: ReviewDecision,
    comment: Option<String>,
}

impl SubmitReviewRequest {
    /// Creates a review request without a comment.
    #[must_use]
    pub const fn new(target: WorkItemRef, reviewer_id: UserId, decision: ReviewDecision) -> Self {
        Self {
            target,
            reviewer_id,
            decision,
            comment: None,
        }
    }

    /// Attaches a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A transition together with the item's state after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransition {
    /// What moved and what it cascaded to.
    pub outcome: TransitionOutcome,
    /// The item after the transition.
    pub item: WorkItem,
}

/// Workflow transition service.
#[derive(Clone)]
pub struct TransitionService<R, C>
where
    R: WorkflowRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    rules: WorkflowRules,
}

impl<R, C> TransitionService<R, C>
where
    R: WorkflowRepository + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a transition service with default workflow rules.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            rules: WorkflowRules::default(),
        }
    }

    /// Sets the workflow rules.
    #[must_use]
    pub const fn with_rules(mut self, rules: WorkflowRules) -> Self {
        self.rules = rules;
        self
    }

    /// Applies a workflow action to a plan or task.
    ///
    /// The status read, the approval count and the write happen in one unit
    /// of work, so of two concurrent qualifying approvals exactly one moves
    /// the item and the other sees the new status.
    ///
    /// # Errors
    ///
    /// Returns conflicts for illegal moves, unmet gates and stale versions,
    /// and not-found errors.
    #[tracing::instrument(
        skip(self, request),
        fields(item = %request.item, action = %request.action, actor = %request.actor)
    )]
    pub async fn transition(&self, request: TransitionRequest) -> WorkflowServiceResult<AppliedTransition> {
        let TransitionRequest {
            item,
            action,
            actor,
            expected,
        } = request;
        let project_id = owning_project(&*self.repository, item).await?;
        let rules = self.rules;
        let now = self.clock.utc();

        let result = self
            .repository
            .transact(project_id, move |board| {
                let outcome = board.transition(item, action, actor, expected, rules, now)?;
                let entity = board.item(item)?;
                Ok::<_, WorkflowServiceError>(AppliedTransition {
                    outcome,
                    item: entity,
                })
            })
            .await;

        match result {
            Ok(applied) => {
                let outcome = &applied.outcome;
                tracing::info!(
                    item = %item,
                    from = %outcome.from,
                    to = %outcome.to,
                    version = %outcome.version,
                    rederived = outcome.rederived.len(),
                    "transition applied"
                );
                Ok(applied)
            }
            Err(err) => {
                if err.kind() == ErrorKind::Conflict {
                    tracing::warn!(item = %item, action = %action, error = %err, "transition rejected");
                }
                Err(err)
            }
        }
    }

    /// Records a review of an item in review. Does not transition.
    ///
    /// # Errors
    ///
    /// Returns a conflict when the target is not in review, and not-found
    /// errors.
    #[tracing::instrument(skip(self, request), fields(target = %request.target))]
    pub async fn submit_review(&self, request: SubmitReviewRequest) -> WorkflowServiceResult<Review> {
        let SubmitReviewRequest {
            target,
            reviewer_id,
            decision,
            comment,
        } = request;
        let project_id = owning_project(&*self.repository, target).await?;
        let now = self.clock.utc();
        let review = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, WorkflowServiceError>(
                    board
                        .submit_review(target, reviewer_id, decision, comment, now)?
                        .clone(),
                )
            })
            .await?;
        tracing::info!(
            target = %target,
            reviewer_id = %reviewer_id,
            decision = %decision,
            "review submitted"
        );
        Ok(review)
    }

    /// Lists the reviews of a plan or task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns not-found errors.
    pub async fn list_reviews(&self, target: WorkItemRef) -> WorkflowServiceResult<Vec<Review>> {
        let project_id = owning_project(&*self.repository, target).await?;
        let board = self.repository.load_board(project_id).await?;
        Ok(board.reviews_for(target)?.into_iter().cloned().collect())
    }

    /// Counts approvals of a plan or task against its project threshold.
    ///
    /// # Errors
    ///
    /// Returns not-found errors.
    pub async fn approval_tally(&self, target: WorkItemRef) -> WorkflowServiceResult<ApprovalTally> {
        let project_id = owning_project(&*self.repository, target).await?;
        let board = self.repository.load_board(project_id).await?;
        Ok(board.approval_tally(target)?)
    }
}
