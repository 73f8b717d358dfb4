//! Application services for the workflow engine.
//!
//! Each service resolves the owning project, then runs one unit of work
//! against the project's board through [`WorkflowRepository::transact`].
//!
//! [`WorkflowRepository::transact`]: crate::workflow::ports::WorkflowRepository::transact

mod error;
mod lookup;
mod plans;
mod projects;
mod tasks;
mod title_template;
mod transitions;

pub use error::{WorkflowServiceError, WorkflowServiceResult};
pub use plans::{CreatePlanRequest, PlanService};
pub use projects::{CreateProjectRequest, ProjectService};
pub use tasks::{ContentEdit, CreateTaskRequest, TaskService};
pub use title_template::{DEFAULT_SPAWN_TITLE, PlanTitleTemplate};
pub use transitions::{
    AppliedTransition, SubmitReviewRequest, TransitionRequest, TransitionService,
};
