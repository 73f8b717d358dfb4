//! Errors returned by generation services.

use crate::{
    generation::ports::JobQueueError,
    workflow::{
        domain::{ErrorKind, WorkflowDomainError},
        ports::WorkflowRepositoryError,
        services::WorkflowServiceError,
    },
};
use thiserror::Error;

/// Service-level errors for generation coordination.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// No generator is configured, or generation is disabled.
    #[error("generation service is unavailable")]
    Unavailable,

    /// A workflow rule or the repository rejected the operation.
    #[error(transparent)]
    Workflow(#[from] WorkflowServiceError),

    /// The job queue rejected the submission; the plan was marked failed.
    #[error("failed to submit generation job: {0}")]
    Queue(#[from] JobQueueError),

    /// The job queue rejected the submission and marking the plan failed
    /// also failed. The plan may still read as generating until cancelled.
    #[error("failed to submit generation job: {queue}; recording the failure also failed: {record}")]
    SubmissionUnrecorded {
        /// Submission error from the queue.
        queue: JobQueueError,
        /// Error raised while marking the plan failed.
        record: Box<GenerationError>,
    },
}

impl From<WorkflowDomainError> for GenerationError {
    fn from(err: WorkflowDomainError) -> Self {
        Self::Workflow(WorkflowServiceError::Domain(err))
    }
}

impl From<WorkflowRepositoryError> for GenerationError {
    fn from(err: WorkflowRepositoryError) -> Self {
        Self::Workflow(WorkflowServiceError::Repository(err))
    }
}

impl GenerationError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable => ErrorKind::Unavailable,
            Self::Workflow(err) => err.kind(),
            Self::Queue(_) | Self::SubmissionUnrecorded { .. } => ErrorKind::TransientQueue,
        }
    }

    /// Returns whether retrying the operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Workflow(err) => err.is_retryable(),
            Self::Unavailable | Self::Queue(_) => self.kind().is_retryable(),
            Self::SubmissionUnrecorded { .. } => false,
        }
    }
}

/// Result type for generation service operations.
pub type GenerationServiceResult<T> = Result<T, GenerationError>;
