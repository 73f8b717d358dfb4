//! When steps for workflow BDD scenarios.

use super::world::{WorkflowWorld, run_async};
use atelier::{
    generation::{
        domain::{GenerationOutcome, GenerationResult},
        services::GenerationError,
    },
    workflow::{
        domain::{Actor, ReviewDecision, UserId, WorkItemRef, WorkflowAction},
        services::{SubmitReviewRequest, TransitionRequest, WorkflowServiceError},
    },
};
use eyre::WrapErr;
use rstest_bdd_macros::when;

fn transition(
    world: &mut WorkflowWorld,
    title: &str,
    action: WorkflowAction,
    actor: Actor,
) -> Result<(), eyre::Report> {
    let item = WorkItemRef::Task(world.task(title)?);
    let result = run_async(
        world
            .transitions
            .transition(TransitionRequest::new(item, action, actor)),
    );
    world.observe(result, WorkflowServiceError::kind);
    Ok(())
}

#[when(r#"task "{title}" is merged"#)]
fn task_merged(world: &mut WorkflowWorld, title: String) -> Result<(), eyre::Report> {
    let item = WorkItemRef::Task(world.task(&title)?);
    for action in [WorkflowAction::StartSession, WorkflowAction::EndSession] {
        run_async(
            world
                .transitions
                .transition(TransitionRequest::new(item, action, Actor::SessionRunner)),
        )
        .wrap_err("run session before merge")?;
    }
    run_async(world.transitions.submit_review(SubmitReviewRequest::new(
        item,
        UserId::new(),
        ReviewDecision::Approved,
    )))
    .wrap_err("approve review before merge")?;
    transition(world, &title, WorkflowAction::Approve, Actor::User(UserId::new()))?;
    transition(world, &title, WorkflowAction::CiSucceeded, Actor::Ci)
}

#[when(r#"task "{title}" is approved"#)]
fn task_approved(world: &mut WorkflowWorld, title: String) -> Result<(), eyre::Report> {
    transition(world, &title, WorkflowAction::Approve, Actor::User(UserId::new()))
}

#[when(r#"CI reports failure for task "{title}""#)]
fn ci_failed(world: &mut WorkflowWorld, title: String) -> Result<(), eyre::Report> {
    transition(world, &title, WorkflowAction::CiFailed, Actor::Ci)
}

#[when(r#"task "{title}" is made to depend on "{blocker}""#)]
fn replace_blockers(
    world: &mut WorkflowWorld,
    title: String,
    blocker: String,
) -> Result<(), eyre::Report> {
    let task_id = world.task(&title)?;
    let blocker_id = world.task(&blocker)?;
    let result = run_async(world.tasks.set_blockers(task_id, vec![blocker_id], None));
    world.observe(result, WorkflowServiceError::kind);
    Ok(())
}

#[when(r#"task "{title}" is deleted"#)]
fn delete_task(world: &mut WorkflowWorld, title: String) -> Result<(), eyre::Report> {
    let task_id = world.task(&title)?;
    let result = run_async(world.tasks.delete_task(task_id, None));
    world.observe(result, WorkflowServiceError::kind);
    Ok(())
}

#[when(r#"generation is requested for plan "{title}""#)]
fn request_generation(world: &mut WorkflowWorld, title: String) -> Result<(), eyre::Report> {
    let plan_id = world.plan(&title)?;
    let result = run_async(world.coordinator.start_generation(plan_id, None, None));
    if let Some(accepted) = world.observe(result, GenerationError::kind) {
        world.active_run = Some((accepted.plan_id, accepted.run_id));
    }
    Ok(())
}

#[when(r#"generation is requested again for plan "{title}""#)]
fn request_generation_again(world: &mut WorkflowWorld, title: String) -> Result<(), eyre::Report> {
    let plan_id = world.plan(&title)?;
    let result = run_async(world.coordinator.start_generation(plan_id, None, None));
    world.observe(result, GenerationError::kind);
    Ok(())
}

#[when(r#"the worker delivers content "{content}" twice"#)]
fn deliver_twice(world: &mut WorkflowWorld, content: String) -> Result<(), eyre::Report> {
    let (plan_id, run_id) = world
        .active_run
        .ok_or_else(|| eyre::eyre!("missing generation run in scenario world"))?;
    for _ in 0..2 {
        let applied = run_async(world.coordinator.apply_generation_result(GenerationResult {
            plan_id,
            run_id,
            outcome: GenerationOutcome::PlanContent {
                content: content.clone(),
            },
        }))
        .wrap_err("deliver generation result")?;
        world.deliveries.push(applied);
    }
    Ok(())
}
