//! Given steps for workflow BDD scenarios.

use super::world::{WorkflowWorld, run_async};
use atelier::workflow::{
    domain::{
        Actor, ApprovalThreshold, ProjectSettings, ReviewDecision, UserId, WorkItemRef,
        WorkflowAction,
    },
    services::{
        CreatePlanRequest, CreateProjectRequest, CreateTaskRequest, SubmitReviewRequest,
        TransitionRequest,
    },
};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given("a project requiring {required:u32} task approvals")]
fn project_requiring(world: &mut WorkflowWorld, required: u32) -> Result<(), eyre::Report> {
    let settings = ProjectSettings::with_thresholds(
        ApprovalThreshold::DEFAULT,
        ApprovalThreshold::new(required)?,
    );
    let project = run_async(
        world
            .projects
            .create_project(CreateProjectRequest::new("Atelier").with_settings(settings)),
    )
    .wrap_err("create scenario project")?;
    world.project_id = Some(project.id());
    Ok(())
}

#[given(r#"a task "{title}" with no blockers"#)]
fn unblocked_task(world: &mut WorkflowWorld, title: String) -> Result<(), eyre::Report> {
    create_task(world, title, None)
}

#[given(r#"a task "{title}" blocked by "{blocker}""#)]
fn blocked_task(
    world: &mut WorkflowWorld,
    title: String,
    blocker: String,
) -> Result<(), eyre::Report> {
    create_task(world, title, Some(&blocker))
}

fn create_task(
    world: &mut WorkflowWorld,
    title: String,
    blocker: Option<&str>,
) -> Result<(), eyre::Report> {
    let mut request = CreateTaskRequest::new(world.project()?, title.as_str());
    if let Some(name) = blocker {
        request = request.with_blockers([world.task(name)?]);
    }
    let task = run_async(world.tasks.create_task(request)).wrap_err("create scenario task")?;
    world.task_ids.insert(title, task.id());
    Ok(())
}

#[given(r#"a plan "{title}""#)]
fn plan(world: &mut WorkflowWorld, title: String) -> Result<(), eyre::Report> {
    let created = run_async(
        world
            .plans
            .create_plan(CreatePlanRequest::new(world.project()?, title.as_str())),
    )
    .wrap_err("create scenario plan")?;
    world.plan_ids.insert(title, created.id());
    Ok(())
}

#[given(r#"task "{title}" is in review"#)]
fn task_in_review(world: &mut WorkflowWorld, title: String) -> Result<(), eyre::Report> {
    let item = WorkItemRef::Task(world.task(&title)?);
    for action in [WorkflowAction::StartSession, WorkflowAction::EndSession] {
        run_async(
            world
                .transitions
                .transition(TransitionRequest::new(item, action, Actor::SessionRunner)),
        )
        .wrap_err("run scenario session")?;
    }
    Ok(())
}

#[given(r#"{count:usize} approving reviews on task "{title}""#)]
fn approving_reviews(
    world: &mut WorkflowWorld,
    count: usize,
    title: String,
) -> Result<(), eyre::Report> {
    let item = WorkItemRef::Task(world.task(&title)?);
    for _ in 0..count {
        run_async(world.transitions.submit_review(SubmitReviewRequest::new(
            item,
            UserId::new(),
            ReviewDecision::Approved,
        )))
        .wrap_err("record scenario review")?;
    }
    Ok(())
}

#[given(r#"task "{title}" is approved"#)]
fn task_approved(world: &mut WorkflowWorld, title: String) -> Result<(), eyre::Report> {
    let item = WorkItemRef::Task(world.task(&title)?);
    run_async(world.transitions.transition(TransitionRequest::new(
        item,
        WorkflowAction::Approve,
        Actor::User(UserId::new()),
    )))
    .wrap_err("approve scenario task")?;
    Ok(())
}
