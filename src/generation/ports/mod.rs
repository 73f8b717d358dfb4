//! Port contracts for generation jobs.

pub mod generator;
pub mod queue;

pub use generator::{GenerationClient, GenerationClientError, GenerationClientResult};
pub use queue::{JobQueue, JobQueueError, JobQueueResult};
