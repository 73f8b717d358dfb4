//! In-memory integration tests for blocking dependencies.

use crate::in_memory::helpers::{Workbench, workbench};
use atelier::{
    config::AtelierConfig,
    workflow::domain::{
        Actor, BlockerResolution, ErrorKind, Task, WorkflowAction, WorkflowStatus,
    },
};
use eyre::ensure;
use rstest::rstest;

fn ids(tasks: &[Task]) -> Vec<atelier::workflow::domain::TaskId> {
    let mut found: Vec<_> = tasks.iter().map(Task::id).collect();
    found.sort();
    found
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn merging_a_blocker_releases_only_fully_unblocked_dependents(
    workbench: Workbench,
) -> Result<(), eyre::Report> {
    let project = workbench.project().await?;
    let schema = workbench.task(&project, "Schema", &[]).await?;
    let fixtures = workbench.task(&project, "Fixtures", &[]).await?;
    let queries = workbench.task(&project, "Queries", &[schema.id()]).await?;
    let reports = workbench
        .task(&project, "Reports", &[schema.id(), fixtures.id()])
        .await?;

    workbench.merge(schema.id()).await?;

    ensure!(workbench.status_of(queries.id()).await? == WorkflowStatus::Backlog);
    ensure!(workbench.status_of(reports.id()).await? == WorkflowStatus::Blocked);

    workbench.merge(fixtures.id()).await?;
    ensure!(workbench.status_of(reports.id()).await? == WorkflowStatus::Backlog);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reverse_lookups_follow_blocker_replacement(
    workbench: Workbench,
) -> Result<(), eyre::Report> {
    let project = workbench.project().await?;
    let first = workbench.task(&project, "First", &[]).await?;
    let second = workbench.task(&project, "Second", &[]).await?;
    let task = workbench.task(&project, "Build", &[first.id()]).await?;

    let updated = workbench
        .tasks
        .set_blockers(task.id(), vec![first.id(), second.id()], Some(task.version()))
        .await?;

    let mut expected = vec![first.id(), second.id()];
    expected.sort();
    ensure!(updated.version() == task.version().next());
    ensure!(ids(&workbench.tasks.get_blockers(task.id()).await?) == expected);
    ensure!(ids(&workbench.tasks.get_blocking(second.id()).await?) == vec![task.id()]);

    workbench
        .tasks
        .set_blockers(task.id(), Vec::new(), None)
        .await?;
    ensure!(workbench.tasks.get_blocking(first.id()).await?.is_empty());
    ensure!(workbench.status_of(task.id()).await? == WorkflowStatus::Backlog);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_cycle_leaves_the_graph_untouched(
    workbench: Workbench,
) -> Result<(), eyre::Report> {
    let project = workbench.project().await?;
    let a = workbench.task(&project, "A", &[]).await?;
    let b = workbench.task(&project, "B", &[a.id()]).await?;
    let c = workbench.task(&project, "C", &[b.id()]).await?;

    let result = workbench
        .tasks
        .set_blockers(a.id(), vec![c.id()], None)
        .await;

    ensure!(matches!(result, Err(ref err) if err.kind() == ErrorKind::Cycle));
    let unchanged = workbench.tasks.get_task(a.id()).await?;
    ensure!(unchanged.blocked_by().is_empty());
    ensure!(unchanged.version() == a.version());
    ensure!(unchanged.status() == WorkflowStatus::Backlog);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn merged_only_policy_keeps_dependents_of_closed_blockers_blocked()
-> Result<(), eyre::Report> {
    let mut config = AtelierConfig::default();
    config.workflow.resolution = BlockerResolution::MergedOnly;
    let workbench = Workbench::from_config(&config)?;
    let project = workbench.project().await?;
    let blocker = workbench.task(&project, "Spike", &[]).await?;
    let task = workbench.task(&project, "Build", &[blocker.id()]).await?;

    workbench
        .act(blocker.id(), WorkflowAction::Close, Actor::System)
        .await?;

    ensure!(workbench.status_of(task.id()).await? == WorkflowStatus::Blocked);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closing_a_blocker_releases_dependents_by_default(
    workbench: Workbench,
) -> Result<(), eyre::Report> {
    let project = workbench.project().await?;
    let blocker = workbench.task(&project, "Spike", &[]).await?;
    let task = workbench.task(&project, "Build", &[blocker.id()]).await?;

    workbench
        .act(blocker.id(), WorkflowAction::Close, Actor::System)
        .await?;

    ensure!(workbench.status_of(task.id()).await? == WorkflowStatus::Backlog);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn blocked_tasks_cannot_start_sessions(workbench: Workbench) -> Result<(), eyre::Report> {
    let project = workbench.project().await?;
    let blocker = workbench.task(&project, "Schema", &[]).await?;
    let task = workbench.task(&project, "Queries", &[blocker.id()]).await?;

    let result = workbench
        .act(task.id(), WorkflowAction::StartSession, Actor::SessionRunner)
        .await;

    ensure!(result.is_err());
    ensure!(workbench.status_of(task.id()).await? == WorkflowStatus::Blocked);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_blocker_releases_dependents(workbench: Workbench) -> Result<(), eyre::Report> {
    let project = workbench.project().await?;
    let blocker = workbench.task(&project, "Schema", &[]).await?;
    let task = workbench.task(&project, "Queries", &[blocker.id()]).await?;

    let dependents = workbench.tasks.delete_task(blocker.id(), None).await?;

    ensure!(dependents == vec![task.id()]);
    let released = workbench.tasks.get_task(task.id()).await?;
    ensure!(released.blocked_by().is_empty());
    ensure!(released.status() == WorkflowStatus::Backlog);
    Ok(())
}
