//! Tests for single-flight job coordination.

use std::sync::Arc;

use super::fixtures::{GenerationWorld, MockGenerator, generated, world};
use crate::{
    generation::{
        adapters::memory::JobState,
        domain::{GenerationJob, GenerationOutcome, GenerationResult, IdempotencyKey, JobId},
        ports::{JobQueue, JobQueueError, JobQueueResult},
        services::{GenerationCoordinator, GenerationError},
    },
    workflow::{
        adapters::memory::InMemoryWorkflowRepository,
        domain::{
            ErrorKind, GENERATION_CANCELLED, GenerationKind, GenerationRunId, PlanId,
            ProcessingStatus, Version, WorkflowDomainError, WorkflowStatus,
        },
        ports::WorkflowRepository,
        services::WorkflowServiceError,
    },
};
use async_trait::async_trait;
use eyre::{Result, ensure};
use mockable::DefaultClock;
use rstest::rstest;

/// Queue that deletes the plan it is handed, then refuses the job.
struct PlanDeletingQueue {
    repository: Arc<InMemoryWorkflowRepository>,
}

#[async_trait]
impl JobQueue for PlanDeletingQueue {
    async fn enqueue(&self, _key: &IdempotencyKey, job: &GenerationJob) -> JobQueueResult<JobId> {
        let plan_id = job.plan_id;
        let now = chrono::Utc::now();
        self.repository
            .transact(job.project_id, move |board| {
                Ok::<_, WorkflowServiceError>(board.delete_plan(plan_id, None, now)?)
            })
            .await
            .map_err(JobQueueError::backend)?;
        Err(JobQueueError::Rejected("queue offline".to_owned()))
    }

    async fn is_running(&self, _key: &IdempotencyKey) -> JobQueueResult<bool> {
        Ok(false)
    }

    async fn cancel(&self, _key: &IdempotencyKey) -> JobQueueResult<bool> {
        Ok(false)
    }
}

fn content_result(plan_id: PlanId, run_id: GenerationRunId, content: &str) -> GenerationResult {
    GenerationResult {
        plan_id,
        run_id,
        outcome: GenerationOutcome::PlanContent {
            content: content.to_owned(),
        },
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn starting_claims_the_plan_and_enqueues_one_job(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan = world.plan(None).await;

    let accepted = coordinator
        .start_generation(plan.id(), Some("focus on storage".to_owned()), Some(plan.version()))
        .await?;

    let stored = world.reload(plan.id()).await;
    let jobs = world.queue.jobs()?;
    ensure!(stored.processing_status() == ProcessingStatus::Generating);
    ensure!(stored.generation_run().map(|run| run.id) == Some(accepted.run_id));
    ensure!(accepted.key == IdempotencyKey::new(GenerationKind::PlanContent, plan.id()));
    ensure!(jobs.len() == 1);
    let [queued] = jobs.as_slice() else {
        eyre::bail!("expected one job, got {jobs:?}");
    };
    ensure!(queued.id == accepted.job_id);
    ensure!(queued.job.context.as_deref() == Some("focus on storage"));
    ensure!(queued.job.title == "Storage rewrite");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_start_while_in_flight_conflicts(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan = world.plan(None).await;
    coordinator.start_generation(plan.id(), None, None).await?;

    let err = coordinator
        .start_generation(plan.id(), None, None)
        .await
        .expect_err("job already in flight");

    ensure!(err.kind() == ErrorKind::Conflict);
    ensure!(world.queue.jobs()?.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn in_flight_claim_is_refused_even_when_the_queue_forgot_the_job(
    world: GenerationWorld,
) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan = world.plan(None).await;
    let accepted = coordinator.start_generation(plan.id(), None, None).await?;
    world.queue.finish(&accepted.key)?;

    let err = coordinator
        .start_generation(plan.id(), None, None)
        .await
        .expect_err("plan still generating");

    ensure!(matches!(
        err,
        GenerationError::Workflow(WorkflowServiceError::Domain(
            WorkflowDomainError::GenerationInFlight(id)
        )) if id == plan.id()
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_expected_version_is_rejected_before_enqueue(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan = world.plan(None).await;

    let err = coordinator
        .start_generation(plan.id(), None, Some(Version::from_persisted(9)))
        .await
        .expect_err("stale version");

    ensure!(err.kind() == ErrorKind::Conflict);
    ensure!(world.queue.jobs()?.is_empty());
    ensure!(world.reload(plan.id()).await.processing_status() == ProcessingStatus::Pending);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn applying_a_result_twice_changes_the_plan_once(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan = world.plan(None).await;
    let accepted = coordinator.start_generation(plan.id(), None, None).await?;

    let first = coordinator
        .apply_generation_result(content_result(plan.id(), accepted.run_id, "# Plan"))
        .await?;
    let second = coordinator
        .apply_generation_result(content_result(plan.id(), accepted.run_id, "# Plan"))
        .await?;

    ensure!(first.applied);
    ensure!(!second.applied);
    ensure!(second.plan.version() == first.plan.version());
    ensure!(first.plan.content() == Some("# Plan"));
    ensure!(first.plan.processing_status() == ProcessingStatus::Completed);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refused_submission_marks_the_plan_failed(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan = world.plan(None).await;
    world
        .queue
        .refuse_submissions(Some("queue offline".to_owned()))?;

    let err = coordinator
        .start_generation(plan.id(), None, None)
        .await
        .expect_err("submission refused");

    let stored = world.reload(plan.id()).await;
    ensure!(err.kind() == ErrorKind::TransientQueue);
    ensure!(err.is_retryable());
    ensure!(stored.processing_status() == ProcessingStatus::Failed);
    ensure!(
        stored
            .processing_error()
            .is_some_and(|reason| reason.contains("queue offline"))
    );

    world.queue.refuse_submissions(None)?;
    coordinator.start_generation(plan.id(), None, None).await?;
    ensure!(world.reload(plan.id()).await.processing_status() == ProcessingStatus::Generating);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelling_fails_the_plan_and_cancels_the_job(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan = world.plan(None).await;
    let accepted = coordinator.start_generation(plan.id(), None, None).await?;

    let cancelled = coordinator.cancel_generation(plan.id(), None).await?;
    let late = coordinator
        .apply_generation_result(content_result(plan.id(), accepted.run_id, "# Late"))
        .await?;

    ensure!(cancelled.processing_status() == ProcessingStatus::Failed);
    ensure!(cancelled.processing_error() == Some(GENERATION_CANCELLED));
    ensure!(!late.applied);
    ensure!(late.plan.content().is_none());
    ensure!(
        world
            .queue
            .jobs()?
            .iter()
            .all(|queued| queued.state == JobState::Cancelled)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelling_an_idle_plan_conflicts(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan = world.plan(None).await;

    let err = coordinator
        .cancel_generation(plan.id(), None)
        .await
        .expect_err("nothing to cancel");

    ensure!(err.kind() == ErrorKind::Conflict);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disabled_generation_is_unavailable(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new()).with_enabled(false);
    let plan = world.plan(None).await;

    let err = coordinator
        .start_generation(plan.id(), None, None)
        .await
        .expect_err("generation disabled");

    ensure!(matches!(err, GenerationError::Unavailable));
    ensure!(err.kind() == ErrorKind::Unavailable);
    ensure!(world.reload(plan.id()).await.version() == plan.version());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_generator_is_unavailable(world: GenerationWorld) -> Result<()> {
    let coordinator = GenerationCoordinator::new(
        Arc::clone(&world.repository),
        Arc::clone(&world.queue),
        Arc::new(DefaultClock),
    );
    let plan = world.plan(None).await;

    let err = coordinator
        .start_task_breakdown(plan.id(), None)
        .await
        .expect_err("no generator");

    ensure!(err.kind() == ErrorKind::Unavailable);
    ensure!(world.queue.jobs()?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn breakdown_of_an_unapproved_plan_conflicts(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan = world.plan(Some("## Steps")).await;

    let err = coordinator
        .start_task_breakdown(plan.id(), None)
        .await
        .expect_err("plan not approved");

    ensure!(err.kind() == ErrorKind::Conflict);
    ensure!(world.queue.jobs()?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn breakdown_result_creates_linked_tasks(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan = world.approved_plan("## Steps").await;
    let accepted = coordinator.start_task_breakdown(plan.id(), None).await?;

    let applied = coordinator
        .apply_generation_result(GenerationResult {
            plan_id: plan.id(),
            run_id: accepted.run_id,
            outcome: GenerationOutcome::Tasks {
                tasks: vec![
                    generated("Schema", &[]),
                    generated("Queries", &[0, -1, 5]),
                ],
            },
        })
        .await?;

    let [schema, queries] = applied.created_tasks.as_slice() else {
        eyre::bail!("expected two tasks, got {:?}", applied.created_tasks);
    };
    let blocked = world.tasks.get_task(*queries).await?;
    ensure!(blocked.blocked_by().iter().eq([schema]));
    ensure!(blocked.status() == WorkflowStatus::Blocked);
    ensure!(blocked.plan_id() == Some(plan.id()));
    ensure!(applied.plan.status() == WorkflowStatus::Approved);
    ensure!(applied.plan.processing_status() == ProcessingStatus::Completed);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn blank_generated_title_fails_the_run(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan = world.approved_plan("## Steps").await;
    let accepted = coordinator.start_task_breakdown(plan.id(), None).await?;

    let applied = coordinator
        .apply_generation_result(GenerationResult {
            plan_id: plan.id(),
            run_id: accepted.run_id,
            outcome: GenerationOutcome::Tasks {
                tasks: vec![generated("Schema", &[]), generated("  ", &[0])],
            },
        })
        .await?;

    ensure!(applied.applied);
    ensure!(applied.created_tasks.is_empty());
    ensure!(applied.plan.processing_status() == ProcessingStatus::Failed);
    ensure!(world.tasks.list_tasks(plan.project_id(), None).await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn results_for_unknown_plans_are_not_found(world: GenerationWorld) -> Result<()> {
    let coordinator = world.coordinator(MockGenerator::new());
    let plan_id = PlanId::new();

    let err = coordinator
        .apply_generation_result(content_result(plan_id, GenerationRunId::new(), "# Plan"))
        .await
        .expect_err("unknown plan");

    ensure!(err.kind() == ErrorKind::NotFound);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unrecorded_submission_failure_reports_both_errors(world: GenerationWorld) -> Result<()> {
    let queue = Arc::new(PlanDeletingQueue {
        repository: Arc::clone(&world.repository),
    });
    let coordinator =
        GenerationCoordinator::new(Arc::clone(&world.repository), queue, Arc::new(DefaultClock))
            .with_generator(Arc::new(MockGenerator::new()));
    let plan = world.plan(None).await;

    let err = coordinator
        .start_generation(plan.id(), None, None)
        .await
        .expect_err("submission refused");

    let GenerationError::SubmissionUnrecorded { queue, record } = &err else {
        eyre::bail!("expected an unrecorded submission failure, got {err:?}");
    };
    ensure!(matches!(queue, JobQueueError::Rejected(reason) if reason == "queue offline"));
    ensure!(record.kind() == ErrorKind::NotFound);
    ensure!(err.kind() == ErrorKind::TransientQueue);
    ensure!(!err.is_retryable());
    Ok(())
}
