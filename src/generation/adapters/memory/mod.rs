//! In-memory adapters for generation ports.

mod queue;

pub use queue::{InMemoryJobQueue, JobState, QueuedJob};
