//! Persistence adapters for the workflow engine.
//!
//! - [`memory::InMemoryWorkflowRepository`]: thread-safe in-memory storage
//!   for tests and embedded callers
//! - [`postgres::PostgresWorkflowRepository`]: `PostgreSQL` persistence using
//!   Diesel, with project-row locking and version compare-and-swap

pub mod memory;
pub mod postgres;
