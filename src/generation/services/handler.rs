//! Worker-side handling of dequeued generation jobs.

use super::{GenerationCoordinator, GenerationError, GenerationServiceResult};
use crate::{
    generation::{
        domain::{AppliedGeneration, GenerationJob, GenerationOutcome, GenerationResult},
        ports::JobQueue,
    },
    workflow::{domain::GenerationKind, ports::WorkflowRepository},
};
use mockable::Clock;
use std::sync::Arc;

/// Runs a dequeued job against the generation client and feeds the outcome
/// back through [`GenerationCoordinator::apply_generation_result`].
///
/// Generator failures are recorded on the plan rather than returned, so the
/// worker can acknowledge the job either way.
pub struct GenerationJobHandler<R, Q, C>
where
    R: WorkflowRepository,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    coordinator: Arc<GenerationCoordinator<R, Q, C>>,
}

impl<R, Q, C> GenerationJobHandler<R, Q, C>
where
    R: WorkflowRepository + 'static,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    /// Creates a handler bound to a coordinator.
    #[must_use]
    pub const fn new(coordinator: Arc<GenerationCoordinator<R, Q, C>>) -> Self {
        Self { coordinator }
    }

    /// Handles one job delivery.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Unavailable`] when no generator is
    /// configured, or the error from applying the result.
    #[tracing::instrument(skip_all, fields(plan_id = %job.plan_id, run_id = %job.run_id, kind = %job.kind))]
    pub async fn handle(&self, job: &GenerationJob) -> GenerationServiceResult<AppliedGeneration> {
        let generator = self
            .coordinator
            .generator()
            .ok_or(GenerationError::Unavailable)?;

        let outcome = match job.kind {
            GenerationKind::PlanContent => match generator.generate_plan(job).await {
                Ok(content) => GenerationOutcome::PlanContent { content },
                Err(err) => GenerationOutcome::Failed {
                    error: err.to_string(),
                },
            },
            GenerationKind::TaskBreakdown => match generator.generate_tasks(job).await {
                Ok(tasks) => GenerationOutcome::Tasks { tasks },
                Err(err) => GenerationOutcome::Failed {
                    error: err.to_string(),
                },
            },
        };
        if let GenerationOutcome::Failed { error } = &outcome {
            tracing::warn!(plan_id = %job.plan_id, error = error.as_str(), "generator failed");
        }

        self.coordinator
            .apply_generation_result(GenerationResult {
                plan_id: job.plan_id,
                run_id: job.run_id,
                outcome,
            })
            .await
    }
}
