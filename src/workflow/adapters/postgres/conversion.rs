//! Conversions between workflow domain types and Diesel rows.

use super::models::{PlanRow, ProjectRow, ProjectSettingsRow, ReviewRow, TaskRow};
use crate::workflow::{
    domain::{
        ApprovalThreshold, GenerationKind, GenerationRun, GenerationRunId, HatId,
        PersistedPlanData, PersistedProjectData, PersistedTaskData, Plan, PlanId,
        ProcessingStatus, Project, ProjectId, ProjectSettings, Review, ReviewDecision, ReviewId,
        Task, TaskId, Title, UserId, Version, WorkItemKind, WorkItemRef, WorkflowStatus,
    },
    ports::{WorkflowRepositoryError, WorkflowRepositoryResult},
};
use std::collections::{BTreeSet, HashMap};

pub(crate) fn version_to_db(version: Version) -> WorkflowRepositoryResult<i64> {
    i64::try_from(version.value()).map_err(WorkflowRepositoryError::persistence)
}

pub(crate) fn version_from_db(value: i64) -> WorkflowRepositoryResult<Version> {
    u64::try_from(value)
        .map(Version::from_persisted)
        .map_err(WorkflowRepositoryError::persistence)
}

fn threshold_to_db(threshold: ApprovalThreshold) -> WorkflowRepositoryResult<i32> {
    i32::try_from(threshold.value()).map_err(WorkflowRepositoryError::persistence)
}

fn threshold_from_db(value: i32) -> WorkflowRepositoryResult<ApprovalThreshold> {
    let count = u32::try_from(value).map_err(WorkflowRepositoryError::persistence)?;
    ApprovalThreshold::new(count).map_err(WorkflowRepositoryError::persistence)
}

fn title_from_db(value: &str) -> WorkflowRepositoryResult<Title> {
    Title::new(value).map_err(WorkflowRepositoryError::persistence)
}

pub(crate) fn project_to_rows(
    project: &Project,
) -> WorkflowRepositoryResult<(ProjectRow, ProjectSettingsRow)> {
    let settings = project.settings();
    let hats: Vec<uuid::Uuid> = settings
        .assigned_hats
        .iter()
        .map(|hat| hat.into_inner())
        .collect();
    let assigned_hats = serde_json::to_value(hats).map_err(WorkflowRepositoryError::persistence)?;

    Ok((
        ProjectRow {
            id: project.id().into_inner(),
            name: project.name().to_owned(),
            created_at: project.created_at(),
            updated_at: project.updated_at(),
        },
        ProjectSettingsRow {
            project_id: project.id().into_inner(),
            required_approvals_plan: threshold_to_db(settings.required_approvals_plan)?,
            required_approvals_task: threshold_to_db(settings.required_approvals_task)?,
            auto_approve_main_updates: settings.auto_approve_main_updates,
            assigned_hats,
        },
    ))
}

pub(crate) fn rows_to_project(
    project: ProjectRow,
    settings: ProjectSettingsRow,
) -> WorkflowRepositoryResult<Project> {
    let hats: Vec<uuid::Uuid> = serde_json::from_value(settings.assigned_hats)
        .map_err(WorkflowRepositoryError::persistence)?;
    Ok(Project::from_persisted(PersistedProjectData {
        id: ProjectId::from_uuid(project.id),
        name: project.name,
        settings: ProjectSettings {
            required_approvals_plan: threshold_from_db(settings.required_approvals_plan)?,
            required_approvals_task: threshold_from_db(settings.required_approvals_task)?,
            auto_approve_main_updates: settings.auto_approve_main_updates,
            assigned_hats: hats.into_iter().map(HatId::from_uuid).collect(),
        },
        created_at: project.created_at,
        updated_at: project.updated_at,
    }))
}

pub(crate) fn plan_to_row(plan: &Plan) -> WorkflowRepositoryResult<PlanRow> {
    let run = plan.generation_run();
    Ok(PlanRow {
        id: plan.id().into_inner(),
        project_id: plan.project_id().into_inner(),
        title: plan.title().as_str().to_owned(),
        content: plan.content().map(str::to_owned),
        status: plan.status().as_str().to_owned(),
        parent_task_id: plan.parent_task_id().map(TaskId::into_inner),
        version: version_to_db(plan.version())?,
        processing_status: plan.processing_status().as_str().to_owned(),
        processing_error: plan.processing_error().map(str::to_owned),
        generation_run_id: run.map(|active| active.id.into_inner()),
        generation_kind: run.map(|active| active.kind.as_str().to_owned()),
        created_by: plan.created_by().map(UserId::into_inner),
        created_at: plan.created_at(),
        updated_at: plan.updated_at(),
    })
}

pub(crate) fn row_to_plan(row: PlanRow) -> WorkflowRepositoryResult<Plan> {
    let generation_run = match (row.generation_run_id, row.generation_kind.as_deref()) {
        (Some(id), Some(kind)) => Some(GenerationRun {
            id: GenerationRunId::from_uuid(id),
            kind: GenerationKind::try_from(kind).map_err(WorkflowRepositoryError::persistence)?,
        }),
        _ => None,
    };

    Ok(Plan::from_persisted(PersistedPlanData {
        id: PlanId::from_uuid(row.id),
        project_id: ProjectId::from_uuid(row.project_id),
        title: title_from_db(&row.title)?,
        content: row.content,
        status: WorkflowStatus::try_from(row.status.as_str())
            .map_err(WorkflowRepositoryError::persistence)?,
        parent_task_id: row.parent_task_id.map(TaskId::from_uuid),
        version: version_from_db(row.version)?,
        processing_status: ProcessingStatus::try_from(row.processing_status.as_str())
            .map_err(WorkflowRepositoryError::persistence)?,
        processing_error: row.processing_error,
        generation_run,
        created_by: row.created_by.map(UserId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub(crate) fn task_to_row(task: &Task) -> WorkflowRepositoryResult<TaskRow> {
    Ok(TaskRow {
        id: task.id().into_inner(),
        project_id: task.project_id().into_inner(),
        plan_id: task.plan_id().map(PlanId::into_inner),
        title: task.title().as_str().to_owned(),
        description: task.description().map(str::to_owned),
        status: task.status().as_str().to_owned(),
        version: version_to_db(task.version())?,
        branch: task.branch().map(str::to_owned),
        worktree_path: task.worktree_path().map(str::to_owned),
        session_started_at: task.session_started_at(),
        session_ended_at: task.session_ended_at(),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

/// Converts a task row, attaching its blockers from the loaded edge index.
pub(crate) fn row_to_task(
    row: TaskRow,
    edges: &HashMap<uuid::Uuid, BTreeSet<TaskId>>,
) -> WorkflowRepositoryResult<Task> {
    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        project_id: ProjectId::from_uuid(row.project_id),
        plan_id: row.plan_id.map(PlanId::from_uuid),
        title: title_from_db(&row.title)?,
        description: row.description,
        status: WorkflowStatus::try_from(row.status.as_str())
            .map_err(WorkflowRepositoryError::persistence)?,
        version: version_from_db(row.version)?,
        blocked_by: edges.get(&row.id).cloned().unwrap_or_default(),
        branch: row.branch,
        worktree_path: row.worktree_path,
        session_started_at: row.session_started_at,
        session_ended_at: row.session_ended_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub(crate) fn review_to_row(review: &Review, project_id: ProjectId) -> ReviewRow {
    ReviewRow {
        id: review.id().into_inner(),
        project_id: project_id.into_inner(),
        target_type: review.target().kind().as_str().to_owned(),
        target_id: review.target().uuid(),
        reviewer_id: review.reviewer_id().into_inner(),
        decision: review.decision().as_str().to_owned(),
        comment: review.comment().map(str::to_owned),
        created_at: review.created_at(),
    }
}

pub(crate) fn row_to_review(row: ReviewRow) -> WorkflowRepositoryResult<Review> {
    let kind = WorkItemKind::try_from(row.target_type.as_str())
        .map_err(WorkflowRepositoryError::persistence)?;
    let target = match kind {
        WorkItemKind::Plan => WorkItemRef::Plan(PlanId::from_uuid(row.target_id)),
        WorkItemKind::Task => WorkItemRef::Task(TaskId::from_uuid(row.target_id)),
    };
    let decision = ReviewDecision::try_from(row.decision.as_str())
        .map_err(WorkflowRepositoryError::persistence)?;
    Ok(Review::from_persisted(
        ReviewId::from_uuid(row.id),
        target,
        UserId::from_uuid(row.reviewer_id),
        decision,
        row.comment,
        row.created_at,
    ))
}
