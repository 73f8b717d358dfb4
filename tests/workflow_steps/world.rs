//! Shared world state for workflow BDD scenarios.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use atelier::{
    generation::{
        adapters::memory::InMemoryJobQueue,
        domain::{AppliedGeneration, GeneratedTask, GenerationJob},
        ports::{GenerationClient, GenerationClientError, GenerationClientResult},
        services::GenerationCoordinator,
    },
    workflow::{
        adapters::memory::InMemoryWorkflowRepository,
        domain::{ErrorKind, GenerationRunId, PlanId, ProjectId, TaskId},
        services::{PlanService, ProjectService, TaskService, TransitionService},
    },
};
use mockable::DefaultClock;
use rstest::fixture;

/// Generator for scenarios that deliver results by hand.
struct OfflineGenerator;

#[async_trait]
impl GenerationClient for OfflineGenerator {
    async fn generate_plan(&self, _job: &GenerationJob) -> GenerationClientResult<String> {
        Err(GenerationClientError::NotConfigured)
    }

    async fn generate_tasks(
        &self,
        _job: &GenerationJob,
    ) -> GenerationClientResult<Vec<GeneratedTask>> {
        Err(GenerationClientError::NotConfigured)
    }
}

/// Error observed by the last `When` step.
#[derive(Debug, Clone)]
pub struct ObservedError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Scenario world for workflow behaviour tests.
pub struct WorkflowWorld {
    pub queue: Arc<InMemoryJobQueue>,
    pub projects: ProjectService<InMemoryWorkflowRepository, DefaultClock>,
    pub tasks: TaskService<InMemoryWorkflowRepository, DefaultClock>,
    pub plans: PlanService<InMemoryWorkflowRepository, DefaultClock>,
    pub transitions: TransitionService<InMemoryWorkflowRepository, DefaultClock>,
    pub coordinator:
        GenerationCoordinator<InMemoryWorkflowRepository, InMemoryJobQueue, DefaultClock>,
    pub project_id: Option<ProjectId>,
    pub task_ids: HashMap<String, TaskId>,
    pub plan_ids: HashMap<String, PlanId>,
    pub active_run: Option<(PlanId, GenerationRunId)>,
    pub deliveries: Vec<AppliedGeneration>,
    pub last_error: Option<ObservedError>,
}

impl WorkflowWorld {
    /// Creates a world with fresh in-memory adapters.
    #[must_use]
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryWorkflowRepository::new());
        let queue = Arc::new(InMemoryJobQueue::new());
        let clock = Arc::new(DefaultClock);
        Self {
            projects: ProjectService::new(Arc::clone(&repository), Arc::clone(&clock)),
            tasks: TaskService::new(Arc::clone(&repository), Arc::clone(&clock)),
            plans: PlanService::new(Arc::clone(&repository), Arc::clone(&clock)),
            transitions: TransitionService::new(Arc::clone(&repository), Arc::clone(&clock)),
            coordinator: GenerationCoordinator::new(repository, Arc::clone(&queue), clock)
                .with_generator(Arc::new(OfflineGenerator)),
            queue,
            project_id: None,
            task_ids: HashMap::new(),
            plan_ids: HashMap::new(),
            active_run: None,
            deliveries: Vec::new(),
            last_error: None,
        }
    }

    /// Returns the scenario project.
    ///
    /// # Errors
    ///
    /// Returns an error when no project was created.
    pub fn project(&self) -> Result<ProjectId, eyre::Report> {
        self.project_id
            .ok_or_else(|| eyre::eyre!("missing project in scenario world"))
    }

    /// Returns the task created under `title`.
    ///
    /// # Errors
    ///
    /// Returns an error when no such task was created.
    pub fn task(&self, title: &str) -> Result<TaskId, eyre::Report> {
        self.task_ids
            .get(title)
            .copied()
            .ok_or_else(|| eyre::eyre!("missing task {title:?} in scenario world"))
    }

    /// Returns the plan created under `title`.
    ///
    /// # Errors
    ///
    /// Returns an error when no such plan was created.
    pub fn plan(&self, title: &str) -> Result<PlanId, eyre::Report> {
        self.plan_ids
            .get(title)
            .copied()
            .ok_or_else(|| eyre::eyre!("missing plan {title:?} in scenario world"))
    }

    /// Records the outcome of a `When` step.
    pub fn observe<T, E>(&mut self, result: Result<T, E>, kind: impl Fn(&E) -> ErrorKind) -> Option<T>
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(value) => {
                self.last_error = None;
                Some(value)
            }
            Err(err) => {
                self.last_error = Some(ObservedError {
                    kind: kind(&err),
                    message: err.to_string(),
                });
                None
            }
        }
    }
}

impl Default for WorkflowWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> WorkflowWorld {
    WorkflowWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
