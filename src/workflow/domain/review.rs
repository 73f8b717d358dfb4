//! Reviews recorded against plans and tasks.

use super::{ParseReviewDecisionError, ReviewId, UserId, WorkItemRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reviewer verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Counts towards the approval threshold.
    Approved,
    /// Asks the author for changes.
    RequestChanges,
    /// Leaves a comment without a verdict.
    CommentOnly,
}

impl ReviewDecision {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::RequestChanges => "request_changes",
            Self::CommentOnly => "comment_only",
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ReviewDecision {
    type Error = ParseReviewDecisionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" => Ok(Self::Approved),
            "request_changes" => Ok(Self::RequestChanges),
            "comment_only" => Ok(Self::CommentOnly),
            _ => Err(ParseReviewDecisionError(value.to_owned())),
        }
    }
}

/// A single reviewer decision on a plan or task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    id: ReviewId,
    target: WorkItemRef,
    reviewer_id: UserId,
    decision: ReviewDecision,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl Review {
    /// Records a new review.
    #[must_use]
    pub fn new(
        target: WorkItemRef,
        reviewer_id: UserId,
        decision: ReviewDecision,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReviewId::new(),
            target,
            reviewer_id,
            decision,
            comment,
            created_at: now,
        }
    }

    /// Reconstructs a review from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: ReviewId,
        target: WorkItemRef,
        reviewer_id: UserId,
        decision: ReviewDecision,
        comment: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            target,
            reviewer_id,
            decision,
            comment,
            created_at,
        }
    }

    /// Returns the review identifier.
    #[must_use]
    pub const fn id(&self) -> ReviewId {
        self.id
    }

    /// Returns the reviewed item.
    #[must_use]
    pub const fn target(&self) -> WorkItemRef {
        self.target
    }

    /// Returns the reviewer.
    #[must_use]
    pub const fn reviewer_id(&self) -> UserId {
        self.reviewer_id
    }

    /// Returns the verdict.
    #[must_use]
    pub const fn decision(&self) -> ReviewDecision {
        self.decision
    }

    /// Returns the comment, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns when the review was recorded.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns whether the review counts towards the approval threshold.
    #[must_use]
    pub const fn is_approval(&self) -> bool {
        matches!(self.decision, ReviewDecision::Approved)
    }
}
