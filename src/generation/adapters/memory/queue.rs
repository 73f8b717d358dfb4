//! In-memory job queue for tests and embedded use.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::generation::{
    domain::{GenerationJob, IdempotencyKey, JobId},
    ports::{JobQueue, JobQueueError, JobQueueResult},
};

/// Lifecycle of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Waiting for a worker.
    Queued,
    /// Taken by a worker.
    Running,
    /// Completed by a worker.
    Finished,
    /// Cancelled before completion.
    Cancelled,
}

impl JobState {
    const fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }
}

/// A job recorded by [`InMemoryJobQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    /// Queue-assigned identifier.
    pub id: JobId,
    /// Idempotency key the job was submitted under.
    pub key: IdempotencyKey,
    /// Payload.
    pub job: GenerationJob,
    /// Current state.
    pub state: JobState,
}

/// Thread-safe in-memory job queue.
///
/// Keeps every submitted job in submission order. Resubmitting the active
/// job for a key returns its id; submitting a different run under that key
/// is rejected. Workers take jobs with
/// [`InMemoryJobQueue::next_job`] and report completion with
/// [`InMemoryJobQueue::finish`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobQueue {
    state: Arc<RwLock<QueueState>>,
}

#[derive(Debug, Default)]
struct QueueState {
    jobs: Vec<QueuedJob>,
    refusal: Option<String>,
}

impl QueueState {
    fn active_mut(&mut self, key: &IdempotencyKey) -> Option<&mut QueuedJob> {
        self.jobs
            .iter_mut()
            .find(|queued| queued.key == *key && queued.state.is_active())
    }
}

fn poisoned(err: impl std::fmt::Display) -> JobQueueError {
    JobQueueError::backend(std::io::Error::other(err.to_string()))
}

impl InMemoryJobQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes later submissions fail with `reason`, or accepts them again
    /// when `reason` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Backend`] when the queue lock is poisoned.
    pub fn refuse_submissions(&self, reason: Option<String>) -> JobQueueResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.refusal = reason;
        Ok(())
    }

    /// Takes the oldest queued job and marks it running.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Backend`] when the queue lock is poisoned.
    pub fn next_job(&self) -> JobQueueResult<Option<GenerationJob>> {
        let mut state = self.state.write().map_err(poisoned)?;
        Ok(state
            .jobs
            .iter_mut()
            .find(|queued| queued.state == JobState::Queued)
            .map(|queued| {
                queued.state = JobState::Running;
                queued.job.clone()
            }))
    }

    /// Marks the active job under `key` finished. Returns whether one was
    /// active.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Backend`] when the queue lock is poisoned.
    pub fn finish(&self, key: &IdempotencyKey) -> JobQueueResult<bool> {
        let mut state = self.state.write().map_err(poisoned)?;
        Ok(state.active_mut(key).is_some_and(|queued| {
            queued.state = JobState::Finished;
            true
        }))
    }

    /// Returns every submitted job in submission order.
    ///
    /// # Errors
    ///
    /// Returns [`JobQueueError::Backend`] when the queue lock is poisoned.
    pub fn jobs(&self) -> JobQueueResult<Vec<QueuedJob>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.jobs.clone())
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, key: &IdempotencyKey, job: &GenerationJob) -> JobQueueResult<JobId> {
        let mut state = self.state.write().map_err(poisoned)?;
        if let Some(reason) = &state.refusal {
            return Err(JobQueueError::Rejected(reason.clone()));
        }
        if let Some(existing) = state.active_mut(key) {
            if existing.job.run_id == job.run_id {
                return Ok(existing.id);
            }
            return Err(JobQueueError::Rejected(format!(
                "{key} is active for run {}",
                existing.job.run_id
            )));
        }
        let id = JobId::new();
        state.jobs.push(QueuedJob {
            id,
            key: key.clone(),
            job: job.clone(),
            state: JobState::Queued,
        });
        Ok(id)
    }

    async fn is_running(&self, key: &IdempotencyKey) -> JobQueueResult<bool> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .jobs
            .iter()
            .any(|queued| queued.key == *key && queued.state.is_active()))
    }

    async fn cancel(&self, key: &IdempotencyKey) -> JobQueueResult<bool> {
        let mut state = self.state.write().map_err(poisoned)?;
        Ok(state.active_mut(key).is_some_and(|queued| {
            queued.state = JobState::Cancelled;
            true
        }))
    }
}
