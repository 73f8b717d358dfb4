//! In-memory integration tests for queued generation jobs.

use std::sync::Arc;

use crate::in_memory::helpers::{Workbench, workbench};
use async_trait::async_trait;
use atelier::{
    config::AtelierConfig,
    generation::{
        domain::{GeneratedTask, GenerationJob},
        ports::{GenerationClient, GenerationClientError, GenerationClientResult},
        services::GenerationJobHandler,
    },
    workflow::{
        domain::{
            Actor, ErrorKind, PlanId, ProcessingStatus, UserId, WorkflowAction, WorkflowStatus,
        },
        services::CreatePlanRequest,
    },
};
use eyre::ensure;
use rstest::rstest;

/// Generator returning canned output.
struct ScriptedGenerator {
    content: String,
    tasks: Vec<GeneratedTask>,
}

#[async_trait]
impl GenerationClient for ScriptedGenerator {
    async fn generate_plan(&self, job: &GenerationJob) -> GenerationClientResult<String> {
        if job.title.is_empty() {
            return Err(GenerationClientError::InvalidResponse("untitled plan".to_owned()));
        }
        Ok(format!("# {}\n\n{}", job.title, self.content))
    }

    async fn generate_tasks(
        &self,
        _job: &GenerationJob,
    ) -> GenerationClientResult<Vec<GeneratedTask>> {
        Ok(self.tasks.clone())
    }
}

fn scripted() -> Arc<ScriptedGenerator> {
    let task = |title: &str, blocked_by_indices: Vec<i64>| GeneratedTask {
        title: title.to_owned(),
        description: Some(format!("Implement {title}")),
        blocked_by_indices,
    };
    Arc::new(ScriptedGenerator {
        content: "- migrate storage".to_owned(),
        tasks: vec![
            task("Schema", Vec::new()),
            task("Backfill", vec![0]),
            task("Cutover", vec![0, 1, 9]),
        ],
    })
}

async fn run_next_job(
    workbench: &Workbench,
    handler: &GenerationJobHandler<
        atelier::workflow::adapters::memory::InMemoryWorkflowRepository,
        atelier::generation::adapters::memory::InMemoryJobQueue,
        mockable::DefaultClock,
    >,
) -> Result<atelier::generation::domain::AppliedGeneration, eyre::Report> {
    let job = workbench
        .queue
        .next_job()?
        .ok_or_else(|| eyre::eyre!("expected a queued job"))?;
    let applied = handler.handle(&job).await?;
    workbench.queue.finish(&job.key())?;
    Ok(applied)
}

async fn approve_plan(workbench: &Workbench, plan_id: PlanId) -> Result<(), eyre::Report> {
    workbench.run_session(plan_id).await?;
    workbench.approve_reviews(plan_id, 1).await?;
    workbench
        .act(plan_id, WorkflowAction::Approve, Actor::User(UserId::new()))
        .await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn plan_content_then_breakdown(workbench: Workbench) -> Result<(), eyre::Report> {
    let coordinator = Arc::new(workbench.coordinator.clone().with_generator(scripted()));
    let handler = GenerationJobHandler::new(Arc::clone(&coordinator));
    let project = workbench.project().await?;
    let plan = workbench
        .plans
        .create_plan(CreatePlanRequest::new(project.id(), "Storage rewrite"))
        .await?;

    coordinator.start_generation(plan.id(), None, None).await?;
    let drafted = run_next_job(&workbench, &handler).await?;
    ensure!(drafted.plan.content() == Some("# Storage rewrite\n\n- migrate storage"));
    ensure!(drafted.plan.processing_status() == ProcessingStatus::Completed);

    approve_plan(&workbench, plan.id()).await?;
    coordinator.start_task_breakdown(plan.id(), None).await?;
    let broken_down = run_next_job(&workbench, &handler).await?;

    let [schema, backfill, cutover] = broken_down.created_tasks.as_slice() else {
        eyre::bail!("expected three tasks, got {:?}", broken_down.created_tasks);
    };
    let cutover_task = workbench.tasks.get_task(*cutover).await?;
    ensure!(cutover_task.blocked_by().len() == 2);
    ensure!(cutover_task.blocked_by().contains(schema));
    ensure!(cutover_task.blocked_by().contains(backfill));
    ensure!(cutover_task.description() == Some("Implement Cutover"));
    ensure!(workbench.status_of(*schema).await? == WorkflowStatus::Backlog);
    ensure!(workbench.status_of(*backfill).await? == WorkflowStatus::Blocked);

    let listed = workbench
        .tasks
        .list_tasks(project.id(), Some(WorkflowStatus::Blocked))
        .await?;
    ensure!(listed.len() == 2);
    ensure!(listed.iter().all(|task| task.plan_id() == Some(plan.id())));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn redelivered_job_is_applied_once(workbench: Workbench) -> Result<(), eyre::Report> {
    let coordinator = Arc::new(workbench.coordinator.clone().with_generator(scripted()));
    let handler = GenerationJobHandler::new(Arc::clone(&coordinator));
    let project = workbench.project().await?;
    let plan = workbench
        .plans
        .create_plan(CreatePlanRequest::new(project.id(), "Storage rewrite").with_content("## Steps"))
        .await?;
    approve_plan(&workbench, plan.id()).await?;
    coordinator.start_task_breakdown(plan.id(), None).await?;
    let job = workbench
        .queue
        .next_job()?
        .ok_or_else(|| eyre::eyre!("expected a queued job"))?;

    let first = handler.handle(&job).await?;
    let second = handler.handle(&job).await?;

    ensure!(first.created_tasks.len() == 3);
    ensure!(!second.applied);
    ensure!(workbench.tasks.list_tasks(project.id(), None).await?.len() == 3);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disabled_generation_leaves_plans_untouched() -> Result<(), eyre::Report> {
    let mut config = AtelierConfig::default();
    config.generation.enabled = false;
    let workbench = Workbench::from_config(&config)?;
    let coordinator = workbench.coordinator.clone().with_generator(scripted());
    let project = workbench.project().await?;
    let plan = workbench
        .plans
        .create_plan(CreatePlanRequest::new(project.id(), "Storage rewrite"))
        .await?;

    let refused = coordinator.start_generation(plan.id(), None, None).await;

    let err = refused.err().ok_or_else(|| eyre::eyre!("generation should be unavailable"))?;
    ensure!(err.kind() == ErrorKind::Unavailable);
    ensure!(workbench.queue.jobs()?.is_empty());
    let stored = workbench.plans.get_plan(plan.id()).await?;
    ensure!(stored.processing_status() == ProcessingStatus::Pending);
    ensure!(stored.version() == plan.version());
    Ok(())
}
