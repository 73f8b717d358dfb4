//! `PostgreSQL` adapters for workflow persistence.

mod conversion;
mod models;
mod repository;
mod schema;

pub use repository::{PostgresWorkflowRepository, WorkflowPgPool};
