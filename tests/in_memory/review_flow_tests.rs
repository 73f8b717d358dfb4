//! In-memory integration tests for reviews, approval and CI signals.

use crate::in_memory::helpers::{Workbench, workbench};
use atelier::{
    config::AtelierConfig,
    workflow::{
        domain::{
            Actor, ErrorKind, ReviewDecision, TaskApprovalMode, UserId, WorkItemRef,
            WorkflowAction, WorkflowStatus,
        },
        services::{CreatePlanRequest, SubmitReviewRequest, TransitionRequest},
    },
};
use eyre::ensure;
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn configured_thresholds_gate_task_approval() -> Result<(), eyre::Report> {
    let mut config = AtelierConfig::default();
    config.workflow.default_required_approvals_task = 2;
    let workbench = Workbench::from_config(&config)?;
    let project = workbench.project().await?;
    let task = workbench.task(&project, "Build", &[]).await?;
    workbench.run_session(task.id()).await?;
    workbench.approve_reviews(task.id(), 1).await?;

    let refused = workbench
        .transitions
        .transition(TransitionRequest::new(
            WorkItemRef::Task(task.id()),
            WorkflowAction::Approve,
            Actor::User(UserId::new()),
        ))
        .await;
    let refusal = refused.err().ok_or_else(|| eyre::eyre!("approval should be refused"))?;
    ensure!(refusal.to_string() == "Insufficient approvals: 1/2");
    ensure!(refusal.kind() == ErrorKind::Conflict);

    workbench.approve_reviews(task.id(), 1).await?;
    let status = workbench
        .act(task.id(), WorkflowAction::Approve, Actor::User(UserId::new()))
        .await?;
    ensure!(status == WorkflowStatus::Cicd);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn ci_failure_returns_the_task_to_backlog(workbench: Workbench) -> Result<(), eyre::Report> {
    let project = workbench.project().await?;
    let task = workbench.task(&project, "Build", &[]).await?;
    workbench.run_session(task.id()).await?;
    workbench.approve_reviews(task.id(), 1).await?;
    workbench
        .act(task.id(), WorkflowAction::Approve, Actor::User(UserId::new()))
        .await?;

    let status = workbench
        .act(task.id(), WorkflowAction::CiFailed, Actor::Ci)
        .await?;

    ensure!(status == WorkflowStatus::Backlog);
    workbench.run_session(task.id()).await?;
    ensure!(workbench.status_of(task.id()).await? == WorkflowStatus::Review);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn staged_approval_passes_through_approved() -> Result<(), eyre::Report> {
    let mut config = AtelierConfig::default();
    config.workflow.task_approval = TaskApprovalMode::Staged;
    let workbench = Workbench::from_config(&config)?;
    let project = workbench.project().await?;
    let task = workbench.task(&project, "Build", &[]).await?;
    workbench.run_session(task.id()).await?;
    workbench.approve_reviews(task.id(), 1).await?;

    let first = workbench
        .act(task.id(), WorkflowAction::Approve, Actor::User(UserId::new()))
        .await?;
    let second = workbench
        .act(task.id(), WorkflowAction::Approve, Actor::User(UserId::new()))
        .await?;

    ensure!(first == WorkflowStatus::Approved);
    ensure!(second == WorkflowStatus::Cicd);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn requested_changes_do_not_approve_a_plan(
    workbench: Workbench,
) -> Result<(), eyre::Report> {
    let project = workbench.project().await?;
    let plan = workbench
        .plans
        .create_plan(CreatePlanRequest::new(project.id(), "Roadmap").with_content("## Goals"))
        .await?;
    workbench.run_session(plan.id()).await?;
    workbench
        .transitions
        .submit_review(
            SubmitReviewRequest::new(
                WorkItemRef::Plan(plan.id()),
                UserId::new(),
                ReviewDecision::RequestChanges,
            )
            .with_comment("scope is unclear"),
        )
        .await?;

    let tally = workbench
        .transitions
        .approval_tally(WorkItemRef::Plan(plan.id()))
        .await?;
    let refused = workbench
        .act(plan.id(), WorkflowAction::Approve, Actor::User(UserId::new()))
        .await;
    workbench.approve_reviews(plan.id(), 1).await?;
    let status = workbench
        .act(plan.id(), WorkflowAction::Approve, Actor::User(UserId::new()))
        .await?;
    let reviews = workbench
        .transitions
        .list_reviews(WorkItemRef::Plan(plan.id()))
        .await?;

    ensure!(tally.approved == 0 && tally.required == 1);
    ensure!(refused.is_err());
    ensure!(status == WorkflowStatus::Approved);
    ensure!(reviews.len() == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn ci_signals_require_the_ci_actor(workbench: Workbench) -> Result<(), eyre::Report> {
    let project = workbench.project().await?;
    let task = workbench.task(&project, "Build", &[]).await?;
    workbench.run_session(task.id()).await?;
    workbench.approve_reviews(task.id(), 1).await?;
    workbench
        .act(task.id(), WorkflowAction::Approve, Actor::User(UserId::new()))
        .await?;

    let forged = workbench
        .act(task.id(), WorkflowAction::CiSucceeded, Actor::User(UserId::new()))
        .await;

    ensure!(forged.is_err());
    ensure!(workbench.status_of(task.id()).await? == WorkflowStatus::Cicd);
    Ok(())
}
