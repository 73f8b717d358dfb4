//! Workflow and dependency engine.
//!
//! Plans and tasks move through a review-gated lifecycle. Tasks block one
//! another through an acyclic graph that drives their `Backlog`/`Blocked`
//! status, and approval-gated moves count reviews at decision time. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
