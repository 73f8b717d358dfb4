//! Atelier: workflow and dependency engine for AI-assisted software delivery.
//!
//! Plans describe intended work, tasks carry it out, and both move through a
//! review-gated lifecycle. Tasks may block one another; the blocking graph
//! stays acyclic and drives each task's `Backlog`/`Blocked` status. Plan
//! content and task breakdowns can be produced by an external AI worker,
//! with at most one generation job in flight per plan.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, queues, etc.)
//! - **Services**: Orchestration over ports
//!
//! # Modules
//!
//! - [`workflow`]: Projects, plans, tasks, reviews and the blocking graph
//! - [`generation`]: Single-flight AI generation jobs for plans
//! - [`config`]: TOML configuration with environment overrides
//! - [`telemetry`]: Tracing subscriber installation

pub mod config;
pub mod generation;
pub mod telemetry;
pub mod workflow;
