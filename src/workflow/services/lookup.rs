//! Project ownership checks shared by the workflow services.

use super::WorkflowServiceResult;
use crate::workflow::{
    domain::{ProjectId, WorkItemRef, WorkflowDomainError},
    ports::WorkflowRepository,
};

/// Returns the not-found error for a missing plan or task.
pub(super) const fn missing(item: WorkItemRef) -> WorkflowDomainError {
    match item {
        WorkItemRef::Plan(id) => WorkflowDomainError::PlanNotFound(id),
        WorkItemRef::Task(id) => WorkflowDomainError::TaskNotFound(id),
    }
}

/// Returns the project owning `item`.
pub(super) async fn owning_project<R>(
    repository: &R,
    item: WorkItemRef,
) -> WorkflowServiceResult<ProjectId>
where
    R: WorkflowRepository,
{
    repository
        .locate(item)
        .await?
        .ok_or_else(|| missing(item).into())
}

/// Checks that every item exists and belongs to `project_id`.
///
/// Items are checked one at a time, so an unknown id is reported before a
/// later item from another project.
pub(super) async fn ensure_owned_by<R>(
    repository: &R,
    project_id: ProjectId,
    items: impl IntoIterator<Item = WorkItemRef>,
) -> WorkflowServiceResult<()>
where
    R: WorkflowRepository,
{
    for item in items {
        if owning_project(repository, item).await? != project_id {
            return Err(WorkflowDomainError::CrossProject(item).into());
        }
    }
    Ok(())
}
