//! Job queue port.

use crate::generation::domain::{GenerationJob, IdempotencyKey, JobId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for job queue operations.
pub type JobQueueResult<T> = Result<T, JobQueueError>;

/// External queue with at-least-once delivery to the generation worker.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Submits `job` under `key`.
    ///
    /// Submitting a key whose job is still queued or running returns that
    /// job's identifier instead of queueing a second one.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError`] when the queue rejects the submission.
    async fn enqueue(&self, key: &IdempotencyKey, job: &GenerationJob) -> JobQueueResult<JobId>;

    /// Returns whether a job is queued or running under `key`.
    async fn is_running(&self, key: &IdempotencyKey) -> JobQueueResult<bool>;

    /// Cancels the job under `key`. Returns whether a job was cancelled.
    async fn cancel(&self, key: &IdempotencyKey) -> JobQueueResult<bool>;
}

/// Errors returned by job queue implementations.
#[derive(Debug, Clone, Error)]
pub enum JobQueueError {
    /// The queue refused the submission.
    #[error("job queue rejected submission: {0}")]
    Rejected(String),

    /// The queue backend failed.
    #[error("job queue backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl JobQueueError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
