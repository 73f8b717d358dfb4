//! In-memory adapters for workflow persistence.

mod workflow;

pub use workflow::InMemoryWorkflowRepository;
