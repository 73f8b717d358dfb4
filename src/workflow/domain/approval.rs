//! Approval gate for review-guarded transitions.

use super::{ApprovalThreshold, Review, WorkItemRef, WorkflowDomainError};
use serde::{Deserialize, Serialize};

/// Read access to the reviews recorded against work items.
pub trait HasReviews {
    /// Returns every review of `target`, oldest first.
    fn reviews_of(&self, target: WorkItemRef) -> Vec<&Review>;

    /// Counts approving reviews of `target`.
    fn approval_count(&self, target: WorkItemRef) -> u32 {
        let count = self
            .reviews_of(target)
            .into_iter()
            .filter(|review| review.is_approval())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

/// Approval count measured against a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalTally {
    /// Approving reviews counted.
    pub approved: u32,
    /// Threshold in force.
    pub required: u32,
}

impl ApprovalTally {
    /// Returns whether the threshold is met.
    #[must_use]
    pub const fn is_satisfied(self) -> bool {
        self.approved >= self.required
    }
}

/// Evaluates review counts against project thresholds.
///
/// Counts are always read from the supplied source at call time; the gate
/// keeps no state between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApprovalGate;

impl ApprovalGate {
    /// Tallies approving reviews of `target`.
    #[must_use]
    pub fn evaluate(
        reviews: &impl HasReviews,
        target: WorkItemRef,
        required: ApprovalThreshold,
    ) -> ApprovalTally {
        ApprovalTally {
            approved: reviews.approval_count(target),
            required: required.value(),
        }
    }

    /// Tallies approving reviews and requires the threshold to be met.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InsufficientApprovals`] when the count
    /// is below `required`.
    pub fn authorize(
        reviews: &impl HasReviews,
        target: WorkItemRef,
        required: ApprovalThreshold,
    ) -> Result<ApprovalTally, WorkflowDomainError> {
        let tally = Self::evaluate(reviews, target, required);
        if tally.is_satisfied() {
            Ok(tally)
        } else {
            Err(WorkflowDomainError::InsufficientApprovals {
                approved: tally.approved,
                required: tally.required,
            })
        }
    }
}
