//! Service-level errors for workflow operations.

use crate::workflow::{
    domain::{ErrorKind, WorkflowDomainError},
    ports::WorkflowRepositoryError,
};
use thiserror::Error;

/// Errors returned by workflow services.
#[derive(Debug, Clone, Error)]
pub enum WorkflowServiceError {
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] WorkflowDomainError),

    /// The repository failed or detected a concurrent write.
    #[error(transparent)]
    Repository(#[from] WorkflowRepositoryError),

    /// The spawned-plan title template failed to render.
    #[error("failed to render plan title: {reason}")]
    TitleTemplate {
        /// Renderer message.
        reason: String,
    },
}

impl WorkflowServiceError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => err.kind(),
            Self::Repository(err) => repository_kind(err),
            Self::TitleTemplate { .. } => ErrorKind::Validation,
        }
    }

    /// Returns whether retrying the operation may succeed.
    ///
    /// Compare-and-swap failures detected at commit time are retryable: the
    /// unit of work reloads the board on the next attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Repository(err) => err.is_retryable(),
            Self::Domain(_) | Self::TitleTemplate { .. } => self.kind().is_retryable(),
        }
    }
}

const fn repository_kind(err: &WorkflowRepositoryError) -> ErrorKind {
    match err {
        WorkflowRepositoryError::ProjectNotFound(_) => ErrorKind::NotFound,
        WorkflowRepositoryError::DuplicateProject(_)
        | WorkflowRepositoryError::StaleVersion { .. } => ErrorKind::Conflict,
        WorkflowRepositoryError::Persistence(_) => ErrorKind::Internal,
    }
}

/// Result type for workflow service operations.
pub type WorkflowServiceResult<T> = Result<T, WorkflowServiceError>;
