//! Domain model for AI generation jobs.
//!
//! A plan runs at most one generation job at a time. Each accepted job gets
//! a run identifier stored on the plan; results are matched against it so
//! redelivered or superseded results change nothing.

mod job;
mod result;

pub use job::{GenerationAccepted, GenerationJob, IdempotencyKey, JobId};
pub use result::{
    AppliedGeneration, GeneratedTask, GenerationOutcome, GenerationResult, sanitize_breakdown,
};
