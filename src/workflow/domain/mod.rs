//! Domain model for the workflow engine.
//!
//! Plans and tasks move through a shared [`WorkflowStatus`] lifecycle under
//! the rules in [`transition`]. Tasks block one another through an acyclic
//! [`BlockingGraph`], and [`derive_status`] keeps `Backlog`/`Blocked` in step
//! with the graph. All mutations go through a [`ProjectBoard`], which records
//! a change set for the repository to persist.

mod approval;
mod board;
mod derivation;
mod error;
mod graph;
mod ids;
mod item;
mod plan;
mod project;
mod review;
mod rules;
mod status;
mod task;
mod title;
pub mod transition;

pub use approval::{ApprovalGate, ApprovalTally, HasReviews};
pub use board::{
    BoardChanges, BreakdownTask, PlanDraft, ProjectBoard, TaskDraft, TaskUpdate,
    TransitionOutcome,
};
pub use derivation::{cascade, derive_status};
pub use error::{
    ErrorKind, ParseGenerationKindError, ParseProcessingStatusError, ParseReviewDecisionError,
    ParseWorkItemKindError, ParseWorkflowStatusError, WorkflowDomainError,
};
pub use graph::{BlockingCycle, BlockingGraph};
pub use ids::{GenerationRunId, HatId, PlanId, ProjectId, ReviewId, TaskId, UserId, Version};
pub use item::{HasStatus, WorkItem, WorkItemKind, WorkItemRef};
pub use plan::{
    GENERATION_CANCELLED, GenerationKind, GenerationRun, NewPlan, PersistedPlanData, Plan,
};
pub use project::{ApprovalThreshold, PersistedProjectData, Project, ProjectSettings};
pub use review::{Review, ReviewDecision};
pub use rules::{BlockerResolution, TaskApprovalMode, WorkflowRules};
pub use status::{ProcessingStatus, WorkflowStatus};
pub use task::{NewTask, PersistedTaskData, Task};
pub use title::Title;
pub use transition::{
    Actor, Transition, TransitionGate, TransitionRejection, WorkflowAction, authorize_actor,
    next_status,
};
