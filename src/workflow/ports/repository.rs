//! Repository port for projects and their workflow boards.

use crate::workflow::domain::{
    Plan, PlanId, Project, ProjectBoard, ProjectId, Task, TaskId, Version, WorkItemRef,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for workflow repository operations.
pub type WorkflowRepositoryResult<T> = Result<T, WorkflowRepositoryError>;

/// Workflow persistence contract.
///
/// Every mutation of plans, tasks, edges and reviews goes through
/// [`WorkflowRepository::transact`], which serializes units of work per
/// project and persists the board's change set atomically.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Stores a new project with its settings.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::DuplicateProject`] when the id is
    /// already in use.
    async fn store_project(&self, project: &Project) -> WorkflowRepositoryResult<()>;

    /// Finds a project by identifier.
    ///
    /// Returns `None` when the project does not exist.
    async fn find_project(&self, id: ProjectId) -> WorkflowRepositoryResult<Option<Project>>;

    /// Deletes a project and everything it owns.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::ProjectNotFound`] when the project
    /// does not exist.
    async fn delete_project(&self, id: ProjectId) -> WorkflowRepositoryResult<()>;

    /// Returns the project owning a plan or task.
    ///
    /// Returns `None` when the item does not exist.
    async fn locate(&self, item: WorkItemRef) -> WorkflowRepositoryResult<Option<ProjectId>>;

    /// Finds a plan by identifier.
    async fn find_plan(&self, id: PlanId) -> WorkflowRepositoryResult<Option<Plan>>;

    /// Finds a task by identifier.
    async fn find_task(&self, id: TaskId) -> WorkflowRepositoryResult<Option<Task>>;

    /// Loads a read-only snapshot of a project's board.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::ProjectNotFound`] when the project
    /// does not exist.
    async fn load_board(&self, project_id: ProjectId) -> WorkflowRepositoryResult<ProjectBoard>;

    /// Runs `work` against the project's board under a project-scoped
    /// exclusive lock and persists the resulting change set.
    ///
    /// The change set is written only when `work` succeeds, and either all
    /// of it is written or none of it is. Updated rows are written with a
    /// version compare-and-swap against the versions the board was loaded
    /// with.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or a repository error converted
    /// into `E` when the project is missing, a stored version moved on, or
    /// persistence fails.
    async fn transact<T, E, F>(&self, project_id: ProjectId, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut ProjectBoard) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<WorkflowRepositoryError> + Send + 'static;
}

/// Errors returned by workflow repository implementations.
#[derive(Debug, Clone, Error)]
pub enum WorkflowRepositoryError {
    /// A project with the same identifier already exists.
    #[error("duplicate project identifier: {0}")]
    DuplicateProject(ProjectId),

    /// The project was not found.
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// A stored row no longer has the version the board was loaded with.
    #[error("stale version for {item}: expected {expected}")]
    StaleVersion {
        /// Row whose compare-and-swap failed.
        item: WorkItemRef,
        /// Version the write expected.
        expected: Version,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkflowRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns whether retrying the unit of work may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleVersion { .. })
    }
}
