//! Project creation and settings management.

use super::WorkflowServiceResult;
use crate::workflow::{
    domain::{Project, ProjectId, ProjectSettings},
    ports::{WorkflowRepository, WorkflowRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;

/// Request payload for creating a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProjectRequest {
    name: String,
    settings: Option<ProjectSettings>,
}

impl CreateProjectRequest {
    /// Creates a request using the service's default settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: None,
        }
    }

    /// Sets explicit project settings.
    #[must_use]
    pub fn with_settings(mut self, settings: ProjectSettings) -> Self {
        self.settings = Some(settings);
        self
    }
}

/// Project orchestration service.
#[derive(Clone)]
pub struct ProjectService<R, C>
where
    R: WorkflowRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    default_settings: ProjectSettings,
}

impl<R, C> ProjectService<R, C>
where
    R: WorkflowRepository + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a project service with stock default settings.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            default_settings: ProjectSettings::default(),
        }
    }

    /// Sets the settings applied to projects created without explicit ones.
    #[must_use]
    pub fn with_default_settings(mut self, settings: ProjectSettings) -> Self {
        self.default_settings = settings;
        self
    }

    /// Creates and stores a new project.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank names, or a repository error.
    #[tracing::instrument(skip_all)]
    pub async fn create_project(&self, request: CreateProjectRequest) -> WorkflowServiceResult<Project> {
        let settings = request
            .settings
            .unwrap_or_else(|| self.default_settings.clone());
        let project = Project::new(&request.name, settings, self.clock.utc())?;
        self.repository.store_project(&project).await?;
        tracing::info!(project_id = %project.id(), name = project.name(), "project created");
        Ok(project)
    }

    /// Replaces a project's workflow settings.
    ///
    /// New thresholds apply to the next gate evaluation; existing reviews
    /// are not re-evaluated.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown projects, or a repository
    /// error.
    #[tracing::instrument(skip(self, settings), fields(project_id = %project_id))]
    pub async fn update_settings(
        &self,
        project_id: ProjectId,
        settings: ProjectSettings,
    ) -> WorkflowServiceResult<Project> {
        let now = self.clock.utc();
        let project = self
            .repository
            .transact(project_id, move |board| {
                Ok::<_, super::WorkflowServiceError>(board.update_settings(settings, now).clone())
            })
            .await?;
        tracing::info!(
            project_id = %project_id,
            plan_threshold = project.settings().required_approvals_plan.value(),
            task_threshold = project.settings().required_approvals_task.value(),
            "project settings updated"
        );
        Ok(project)
    }

    /// Retrieves a project.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown projects, or a repository
    /// error.
    pub async fn get_project(&self, project_id: ProjectId) -> WorkflowServiceResult<Project> {
        self.repository
            .find_project(project_id)
            .await?
            .ok_or_else(|| WorkflowRepositoryError::ProjectNotFound(project_id).into())
    }

    /// Deletes a project with everything it owns.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown projects, or a repository
    /// error.
    #[tracing::instrument(skip(self), fields(project_id = %project_id))]
    pub async fn delete_project(&self, project_id: ProjectId) -> WorkflowServiceResult<()> {
        self.repository.delete_project(project_id).await?;
        tracing::info!(project_id = %project_id, "project deleted");
        Ok(())
    }
}
