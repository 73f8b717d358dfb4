//! Shared test helpers for in-memory integration tests.

use std::sync::Arc;

use atelier::{
    config::AtelierConfig,
    generation::{adapters::memory::InMemoryJobQueue, services::GenerationCoordinator},
    workflow::{
        adapters::memory::InMemoryWorkflowRepository,
        domain::{
            Actor, Project, ReviewDecision, Task, TaskId, UserId, WorkItemRef, WorkflowAction,
            WorkflowStatus,
        },
        services::{
            CreateProjectRequest, CreateTaskRequest, PlanService, ProjectService,
            SubmitReviewRequest, TaskService, TransitionRequest, TransitionService,
        },
    },
};
use mockable::DefaultClock;
use rstest::fixture;

/// Coordinator type wired to the in-memory adapters.
pub type TestCoordinator =
    GenerationCoordinator<InMemoryWorkflowRepository, InMemoryJobQueue, DefaultClock>;

/// Every service wired to one in-memory repository.
pub struct Workbench {
    pub repository: Arc<InMemoryWorkflowRepository>,
    pub queue: Arc<InMemoryJobQueue>,
    pub projects: ProjectService<InMemoryWorkflowRepository, DefaultClock>,
    pub tasks: TaskService<InMemoryWorkflowRepository, DefaultClock>,
    pub plans: PlanService<InMemoryWorkflowRepository, DefaultClock>,
    pub transitions: TransitionService<InMemoryWorkflowRepository, DefaultClock>,
    pub coordinator: TestCoordinator,
}

impl Workbench {
    /// Wires the services from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn from_config(config: &AtelierConfig) -> Result<Self, eyre::Report> {
        let repository = Arc::new(InMemoryWorkflowRepository::new());
        let queue = Arc::new(InMemoryJobQueue::new());
        let clock = Arc::new(DefaultClock);
        let rules = config.rules();
        Ok(Self {
            projects: ProjectService::new(Arc::clone(&repository), Arc::clone(&clock))
                .with_default_settings(config.default_settings()?),
            tasks: TaskService::new(Arc::clone(&repository), Arc::clone(&clock)).with_rules(rules),
            plans: PlanService::new(Arc::clone(&repository), Arc::clone(&clock))
                .with_title_template(config.title_template()?),
            transitions: TransitionService::new(Arc::clone(&repository), Arc::clone(&clock))
                .with_rules(rules),
            coordinator: GenerationCoordinator::new(
                Arc::clone(&repository),
                Arc::clone(&queue),
                clock,
            )
            .with_rules(rules)
            .with_enabled(config.generation.enabled),
            repository,
            queue,
        })
    }

    /// Creates a project with the configured default settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the project cannot be stored.
    pub async fn project(&self) -> Result<Project, eyre::Report> {
        Ok(self
            .projects
            .create_project(CreateProjectRequest::new("Atelier"))
            .await?)
    }

    /// Creates a task blocked by `blocked_by`.
    ///
    /// # Errors
    ///
    /// Returns an error when the task cannot be created.
    pub async fn task(
        &self,
        project: &Project,
        title: &str,
        blocked_by: &[TaskId],
    ) -> Result<Task, eyre::Report> {
        Ok(self
            .tasks
            .create_task(
                CreateTaskRequest::new(project.id(), title)
                    .with_blockers(blocked_by.iter().copied()),
            )
            .await?)
    }

    /// Applies `action` as `actor` and returns the new status.
    ///
    /// # Errors
    ///
    /// Returns the service error when the transition is rejected.
    pub async fn act(
        &self,
        item: impl Into<WorkItemRef>,
        action: WorkflowAction,
        actor: Actor,
    ) -> Result<WorkflowStatus, eyre::Report> {
        let applied = self
            .transitions
            .transition(TransitionRequest::new(item.into(), action, actor))
            .await?;
        Ok(applied.outcome.to)
    }

    /// Runs a session so the item lands in review.
    ///
    /// # Errors
    ///
    /// Returns an error when either session step is rejected.
    pub async fn run_session(&self, item: impl Into<WorkItemRef>) -> Result<(), eyre::Report> {
        let target = item.into();
        self.act(target, WorkflowAction::StartSession, Actor::SessionRunner)
            .await?;
        self.act(target, WorkflowAction::EndSession, Actor::SessionRunner)
            .await?;
        Ok(())
    }

    /// Records `count` approving reviews from distinct reviewers.
    ///
    /// # Errors
    ///
    /// Returns an error when a review is rejected.
    pub async fn approve_reviews(
        &self,
        item: impl Into<WorkItemRef>,
        count: usize,
    ) -> Result<(), eyre::Report> {
        let target = item.into();
        for _ in 0..count {
            self.transitions
                .submit_review(SubmitReviewRequest::new(
                    target,
                    UserId::new(),
                    ReviewDecision::Approved,
                ))
                .await?;
        }
        Ok(())
    }

    /// Drives a task from backlog through review, approval and CI.
    ///
    /// # Errors
    ///
    /// Returns an error when any step is rejected.
    pub async fn merge(&self, task_id: TaskId) -> Result<(), eyre::Report> {
        self.run_session(task_id).await?;
        self.approve_reviews(task_id, 1).await?;
        self.act(task_id, WorkflowAction::Approve, Actor::User(UserId::new()))
            .await?;
        self.act(task_id, WorkflowAction::CiSucceeded, Actor::Ci)
            .await?;
        Ok(())
    }

    /// Returns the stored status of `task_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the task does not exist.
    pub async fn status_of(&self, task_id: TaskId) -> Result<WorkflowStatus, eyre::Report> {
        Ok(self.tasks.get_task(task_id).await?.status())
    }
}

/// Provides services wired from the default configuration.
#[fixture]
pub fn workbench() -> Workbench {
    Workbench::from_config(&AtelierConfig::default()).unwrap_or_else(|err| {
        panic!("default configuration should wire services: {err}")
    })
}
