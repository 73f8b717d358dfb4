//! Generation results fed back by the worker.

use crate::workflow::domain::{
    BreakdownTask, GenerationRunId, Plan, PlanId, TaskId, Title, WorkflowDomainError,
};
use serde::{Deserialize, Serialize};

/// One task proposed by the generator, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTask {
    /// Proposed title.
    pub title: String,
    /// Proposed description.
    #[serde(default)]
    pub description: Option<String>,
    /// Zero-based positions of the tasks this one depends on.
    #[serde(default)]
    pub blocked_by_indices: Vec<i64>,
}

impl GeneratedTask {
    /// Validates the task at list position `position`.
    ///
    /// Over-long titles are truncated. Indices that do not point at an
    /// earlier position are dropped and logged.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyTitle`] when the title is blank.
    pub fn sanitize(self, position: usize) -> Result<BreakdownTask, WorkflowDomainError> {
        let title = Title::truncated(&self.title)?;
        let mut blocked_by_indices = Vec::with_capacity(self.blocked_by_indices.len());
        for raw in self.blocked_by_indices {
            match usize::try_from(raw) {
                Ok(index) if index < position => blocked_by_indices.push(index),
                _ => tracing::warn!(
                    position,
                    index = raw,
                    title = title.as_str(),
                    "dropping invalid blocked_by index from generated task"
                ),
            }
        }
        Ok(BreakdownTask {
            title,
            description: self.description,
            blocked_by_indices,
        })
    }
}

/// Validates a generated task list in order.
///
/// # Errors
///
/// Returns the first title validation failure.
pub fn sanitize_breakdown(
    generated: Vec<GeneratedTask>,
) -> Result<Vec<BreakdownTask>, WorkflowDomainError> {
    generated
        .into_iter()
        .enumerate()
        .map(|(position, task)| task.sanitize(position))
        .collect()
}

/// What a generation job produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// Markdown content for the plan.
    PlanContent {
        /// Generated content.
        content: String,
    },
    /// Tasks decomposed from the plan.
    Tasks {
        /// Generated tasks in list order.
        tasks: Vec<GeneratedTask>,
    },
    /// The job failed.
    Failed {
        /// Failure description recorded on the plan.
        error: String,
    },
}

/// Completion callback payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Plan the job ran for.
    pub plan_id: PlanId,
    /// Run the result belongs to.
    pub run_id: GenerationRunId,
    /// What the job produced.
    pub outcome: GenerationOutcome,
}

/// Effect of applying a generation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedGeneration {
    /// The plan after the callback.
    pub plan: Plan,
    /// Whether the result changed anything; `false` for redeliveries and
    /// results of superseded runs.
    pub applied: bool,
    /// Tasks created by a task breakdown.
    pub created_tasks: Vec<TaskId>,
}
