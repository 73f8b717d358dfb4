//! AI generation service port.

use crate::generation::domain::{GeneratedTask, GenerationJob};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for generation client operations.
pub type GenerationClientResult<T> = Result<T, GenerationClientError>;

/// AI text generation collaborator invoked by the worker.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generates markdown content from the job's plan title and context.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationClientError`] when generation fails.
    async fn generate_plan(&self, job: &GenerationJob) -> GenerationClientResult<String>;

    /// Decomposes the job's plan content into ordered tasks.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationClientError`] when generation fails or the
    /// response cannot be parsed.
    async fn generate_tasks(&self, job: &GenerationJob)
    -> GenerationClientResult<Vec<GeneratedTask>>;
}

/// Errors returned by generation clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationClientError {
    /// Credentials or endpoint are missing.
    #[error("generation service is not configured")]
    NotConfigured,

    /// The model call failed.
    #[error("generation failed: {0}")]
    Failed(String),

    /// The response did not have the expected shape.
    #[error("invalid generation response: {0}")]
    InvalidResponse(String),
}
