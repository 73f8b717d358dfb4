//! Single-flight coordination of plan generation jobs.

use super::{GenerationError, GenerationServiceResult};
use crate::{
    generation::{
        domain::{
            AppliedGeneration, GenerationAccepted, GenerationJob, GenerationOutcome,
            GenerationResult, IdempotencyKey, sanitize_breakdown,
        },
        ports::{GenerationClient, JobQueue},
    },
    workflow::{
        domain::{
            GenerationKind, GenerationRunId, Plan, PlanId, ProjectId, Version, WorkItemRef,
            WorkflowDomainError, WorkflowRules,
        },
        ports::WorkflowRepository,
    },
};
use mockable::Clock;
use std::sync::Arc;

/// Coordinates at most one in-flight generation job per plan.
///
/// Starting a job asks the queue whether a job is already running under the
/// plan's key, claims the plan in one unit of work, and only then enqueues.
/// Results are applied only to the run recorded on the plan.
pub struct GenerationCoordinator<R, Q, C>
where
    R: WorkflowRepository,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    queue: Arc<Q>,
    clock: Arc<C>,
    generator: Option<Arc<dyn GenerationClient>>,
    enabled: bool,
    rules: WorkflowRules,
}

impl<R, Q, C> Clone for GenerationCoordinator<R, Q, C>
where
    R: WorkflowRepository,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            queue: Arc::clone(&self.queue),
            clock: Arc::clone(&self.clock),
            generator: self.generator.clone(),
            enabled: self.enabled,
            rules: self.rules,
        }
    }
}

impl<R, Q, C> GenerationCoordinator<R, Q, C>
where
    R: WorkflowRepository + 'static,
    Q: JobQueue,
    C: Clock + Send + Sync,
{
    /// Creates a coordinator with no generator; starting jobs is
    /// unavailable until one is attached.
    #[must_use]
    pub fn new(repository: Arc<R>, queue: Arc<Q>, clock: Arc<C>) -> Self {
        Self {
            repository,
            queue,
            clock,
            generator: None,
            enabled: true,
            rules: WorkflowRules::default(),
        }
    }

    /// Attaches the AI generation client.
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn GenerationClient>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Enables or disables new jobs.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the workflow rules used when breakdown tasks are created.
    #[must_use]
    pub const fn with_rules(mut self, rules: WorkflowRules) -> Self {
        self.rules = rules;
        self
    }

    /// Returns the generation client when generation is available.
    #[must_use]
    pub fn generator(&self) -> Option<Arc<dyn GenerationClient>> {
        if self.enabled {
            self.generator.clone()
        } else {
            None
        }
    }

    /// Starts a plan-content job.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Unavailable`] without touching state when
    /// generation is unavailable, a conflict while a job is in flight or the
    /// plan is closed, and [`GenerationError::Queue`] when the submission
    /// fails (the plan is then marked failed). When marking the plan failed
    /// also fails, returns [`GenerationError::SubmissionUnrecorded`].
    #[tracing::instrument(skip(self, context), fields(plan_id = %plan_id))]
    pub async fn start_generation(
        &self,
        plan_id: PlanId,
        context: Option<String>,
        expected: Option<Version>,
    ) -> GenerationServiceResult<GenerationAccepted> {
        self.start(plan_id, GenerationKind::PlanContent, context, expected)
            .await
    }

    /// Starts a task-breakdown job for an approved plan with content.
    ///
    /// # Errors
    ///
    /// As [`GenerationCoordinator::start_generation`], plus conflicts when
    /// the plan is not approved or has no content.
    #[tracing::instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn start_task_breakdown(
        &self,
        plan_id: PlanId,
        expected: Option<Version>,
    ) -> GenerationServiceResult<GenerationAccepted> {
        self.start(plan_id, GenerationKind::TaskBreakdown, None, expected)
            .await
    }

    async fn start(
        &self,
        plan_id: PlanId,
        kind: GenerationKind,
        context: Option<String>,
        expected: Option<Version>,
    ) -> GenerationServiceResult<GenerationAccepted> {
        if self.generator().is_none() {
            return Err(GenerationError::Unavailable);
        }
        let project_id = self.owning_project(plan_id).await?;

        for running_kind in GenerationKind::ALL {
            let running_key = IdempotencyKey::new(running_kind, plan_id);
            if self.queue.is_running(&running_key).await? {
                tracing::warn!(plan_id = %plan_id, key = %running_key, "generation already queued");
                return Err(WorkflowDomainError::GenerationInFlight(plan_id).into());
            }
        }

        let now = self.clock.utc();
        let claimed = self
            .repository
            .transact(project_id, move |board| {
                let run = board.claim_generation(plan_id, kind, expected, now)?;
                let plan = board
                    .plan(plan_id)
                    .ok_or(WorkflowDomainError::PlanNotFound(plan_id))?;
                Ok::<_, GenerationError>(GenerationJob {
                    run_id: run.id,
                    kind,
                    plan_id,
                    project_id,
                    title: plan.title().as_str().to_owned(),
                    content: plan.content().map(str::to_owned),
                    context,
                })
            })
            .await;
        let job = match claimed {
            Ok(job) => job,
            Err(err) => {
                tracing::warn!(plan_id = %plan_id, kind = %kind, error = %err, "generation claim rejected");
                return Err(err);
            }
        };

        let key = job.key();
        match self.queue.enqueue(&key, &job).await {
            Ok(job_id) => {
                tracing::info!(
                    plan_id = %plan_id,
                    run_id = %job.run_id,
                    job_id = %job_id,
                    kind = %kind,
                    "generation job enqueued"
                );
                Ok(GenerationAccepted {
                    plan_id,
                    run_id: job.run_id,
                    job_id,
                    key,
                })
            }
            Err(err) => {
                match self
                    .record_submission_failure(project_id, plan_id, job.run_id, &err.to_string())
                    .await
                {
                    Ok(()) => Err(err.into()),
                    Err(record) => Err(GenerationError::SubmissionUnrecorded {
                        queue: err,
                        record: Box::new(record),
                    }),
                }
            }
        }
    }

    async fn record_submission_failure(
        &self,
        project_id: ProjectId,
        plan_id: PlanId,
        run_id: GenerationRunId,
        reason: &str,
    ) -> GenerationServiceResult<()> {
        tracing::warn!(plan_id = %plan_id, run_id = %run_id, error = reason, "generation job submission failed");
        let error = reason.to_owned();
        let now = self.clock.utc();
        let recorded = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, GenerationError>(board.fail_generation(plan_id, run_id, &error, now)?)
            })
            .await;
        match recorded {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::error!(plan_id = %plan_id, error = %err, "failed to record submission failure");
                Err(err)
            }
        }
    }

    /// Applies a worker result to the plan.
    ///
    /// Results for a run other than the plan's active one, including
    /// redeliveries of an applied result, change nothing and return the
    /// current plan.
    ///
    /// # Errors
    ///
    /// Returns not-found errors for unknown plans and a validation error
    /// when the outcome does not match the run's kind.
    #[tracing::instrument(skip(self, result), fields(plan_id = %result.plan_id, run_id = %result.run_id))]
    pub async fn apply_generation_result(
        &self,
        result: GenerationResult,
    ) -> GenerationServiceResult<AppliedGeneration> {
        let GenerationResult {
            plan_id,
            run_id,
            outcome,
        } = result;
        let project_id = self.owning_project(plan_id).await?;
        let resolution = self.rules.resolution;
        let now = self.clock.utc();

        let applied = self
            .repository
            .transact(project_id, move |board| {
                let mut created_tasks = Vec::new();
                let applied = match outcome {
                    GenerationOutcome::Failed { error } => {
                        board.fail_generation(plan_id, run_id, &error, now)?
                    }
                    GenerationOutcome::PlanContent { content } => {
                        board.apply_plan_content(plan_id, run_id, content, now)?
                    }
                    GenerationOutcome::Tasks { tasks } => match sanitize_breakdown(tasks) {
                        Ok(breakdown) => {
                            match board.apply_task_breakdown(plan_id, run_id, breakdown, resolution, now)? {
                                Some(created) => {
                                    created_tasks = created;
                                    true
                                }
                                None => false,
                            }
                        }
                        Err(err) => {
                            let reason = format!("invalid generated tasks: {err}");
                            board.fail_generation(plan_id, run_id, &reason, now)?
                        }
                    },
                };
                let plan = board
                    .plan(plan_id)
                    .cloned()
                    .ok_or(WorkflowDomainError::PlanNotFound(plan_id))?;
                Ok::<_, GenerationError>(AppliedGeneration {
                    plan,
                    applied,
                    created_tasks,
                })
            })
            .await?;

        if applied.applied {
            tracing::info!(
                plan_id = %plan_id,
                run_id = %run_id,
                processing_status = %applied.plan.processing_status(),
                created_tasks = applied.created_tasks.len(),
                "generation result applied"
            );
        } else {
            tracing::debug!(plan_id = %plan_id, run_id = %run_id, "generation result ignored");
        }
        Ok(applied)
    }

    /// Cancels the plan's in-flight job and marks the plan failed.
    ///
    /// # Errors
    ///
    /// Returns a conflict when the plan is not generating, and not-found or
    /// stale-version errors.
    #[tracing::instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn cancel_generation(
        &self,
        plan_id: PlanId,
        expected: Option<Version>,
    ) -> GenerationServiceResult<Plan> {
        let project_id = self.owning_project(plan_id).await?;
        let now = self.clock.utc();
        let plan = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, GenerationError>(board.cancel_generation(plan_id, expected, now)?.clone())
            })
            .await?;

        if let Some(run) = plan.generation_run() {
            let key = IdempotencyKey::new(run.kind, plan_id);
            match self.queue.cancel(&key).await {
                Ok(cancelled) => {
                    tracing::info!(plan_id = %plan_id, key = %key, queue_cancelled = cancelled, "generation cancelled");
                }
                Err(err) => {
                    tracing::warn!(plan_id = %plan_id, key = %key, error = %err, "queue cancellation failed");
                }
            }
        }
        Ok(plan)
    }

    async fn owning_project(&self, plan_id: PlanId) -> GenerationServiceResult<ProjectId> {
        self.repository
            .locate(WorkItemRef::Plan(plan_id))
            .await?
            .ok_or_else(|| WorkflowDomainError::PlanNotFound(plan_id).into())
    }
}
