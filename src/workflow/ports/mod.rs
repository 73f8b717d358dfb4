//! Port contracts for the workflow engine.
//!
//! Ports define infrastructure-agnostic interfaces used by workflow services.

pub mod repository;

pub use repository::{WorkflowRepository, WorkflowRepositoryError, WorkflowRepositoryResult};
