//! Generation jobs and their idempotency keys.

use crate::workflow::domain::{GenerationKind, GenerationRunId, PlanId, ProjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier assigned by the job queue to an accepted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Creates a new random job identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic queue key for a plan's generation job: `"{kind}:{plan_id}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Builds the key for `kind` jobs on `plan_id`.
    #[must_use]
    pub fn new(kind: GenerationKind, plan_id: PlanId) -> Self {
        Self(format!("{kind}:{plan_id}"))
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload handed to the external worker.
///
/// Carries everything the generator needs, so the worker does not read the
/// store before calling it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Run the result must be matched against.
    pub run_id: GenerationRunId,
    /// Kind of job.
    pub kind: GenerationKind,
    /// Plan being generated for.
    pub plan_id: PlanId,
    /// Project owning the plan.
    pub project_id: ProjectId,
    /// Plan title at submission time.
    pub title: String,
    /// Plan content at submission time; the input of a task breakdown.
    pub content: Option<String>,
    /// Extra context supplied by the caller of a plan-content job.
    pub context: Option<String>,
}

impl GenerationJob {
    /// Returns the job's queue key.
    #[must_use]
    pub fn key(&self) -> IdempotencyKey {
        IdempotencyKey::new(self.kind, self.plan_id)
    }
}

/// Receipt for a generation job accepted by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationAccepted {
    /// Plan being generated for.
    pub plan_id: PlanId,
    /// Run identifier stored on the plan.
    pub run_id: GenerationRunId,
    /// Queue job identifier.
    pub job_id: JobId,
    /// Queue key.
    pub key: IdempotencyKey,
}
