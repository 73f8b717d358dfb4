//! Then steps for workflow BDD scenarios.

use super::world::{WorkflowWorld, run_async};
use atelier::workflow::domain::{ErrorKind, WorkflowStatus};
use eyre::WrapErr;
use rstest_bdd_macros::then;

fn parse_kind(name: &str) -> Result<ErrorKind, eyre::Report> {
    match name {
        "validation" => Ok(ErrorKind::Validation),
        "not found" => Ok(ErrorKind::NotFound),
        "conflict" => Ok(ErrorKind::Conflict),
        "cycle" => Ok(ErrorKind::Cycle),
        "cross project" => Ok(ErrorKind::CrossProject),
        "unavailable" => Ok(ErrorKind::Unavailable),
        other => Err(eyre::eyre!("unknown error kind in scenario: {other}")),
    }
}

#[then(r#"task "{title}" is "{status}""#)]
fn task_status_is(world: &WorkflowWorld, title: String, status: String) -> Result<(), eyre::Report> {
    let expected = WorkflowStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task = run_async(world.tasks.get_task(world.task(&title)?)).wrap_err("load task")?;
    eyre::ensure!(
        task.status() == expected,
        "expected task {title:?} to be {expected}, found {}",
        task.status()
    );
    Ok(())
}

#[then(r#"task "{title}" has {count:usize} blockers"#)]
fn task_blocker_count(
    world: &WorkflowWorld,
    title: String,
    count: usize,
) -> Result<(), eyre::Report> {
    let blockers = run_async(world.tasks.get_blockers(world.task(&title)?)).wrap_err("load blockers")?;
    eyre::ensure!(
        blockers.len() == count,
        "expected {count} blockers, found {}",
        blockers.len()
    );
    Ok(())
}

#[then(r#"the request fails with a "{kind}" error"#)]
fn request_fails_with_kind(world: &WorkflowWorld, kind: String) -> Result<(), eyre::Report> {
    let expected = parse_kind(&kind)?;
    let observed = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the last request to fail"))?;
    eyre::ensure!(
        observed.kind == expected,
        "expected a {expected:?} error, got {observed:?}"
    );
    Ok(())
}

#[then(r#"the request fails with "{message}""#)]
fn request_fails_with_message(world: &WorkflowWorld, message: String) -> Result<(), eyre::Report> {
    let observed = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the last request to fail"))?;
    eyre::ensure!(
        observed.message == message,
        "expected {message:?}, got {:?}",
        observed.message
    );
    Ok(())
}

#[then("{count:usize} generation jobs are queued")]
fn jobs_queued(world: &WorkflowWorld, count: usize) -> Result<(), eyre::Report> {
    let jobs = world.queue.jobs()?;
    eyre::ensure!(jobs.len() == count, "expected {count} jobs, found {}", jobs.len());
    Ok(())
}

#[then(r#"plan "{title}" has content "{content}""#)]
fn plan_content_is(world: &WorkflowWorld, title: String, content: String) -> Result<(), eyre::Report> {
    let plan = run_async(world.plans.get_plan(world.plan(&title)?)).wrap_err("load plan")?;
    eyre::ensure!(
        plan.content() == Some(content.as_str()),
        "expected content {content:?}, found {:?}",
        plan.content()
    );
    Ok(())
}

#[then("the second delivery changed nothing")]
fn second_delivery_ignored(world: &WorkflowWorld) -> Result<(), eyre::Report> {
    let [first, second] = world.deliveries.as_slice() else {
        return Err(eyre::eyre!(
            "expected two deliveries, found {}",
            world.deliveries.len()
        ));
    };
    eyre::ensure!(first.applied, "first delivery should apply");
    eyre::ensure!(!second.applied, "second delivery should be ignored");
    eyre::ensure!(
        second.plan.version() == first.plan.version(),
        "redelivery must not bump the version"
    );
    Ok(())
}
