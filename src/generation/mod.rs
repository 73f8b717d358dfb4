//! AI generation jobs for plans.
//!
//! The coordinator enqueues jobs for an external worker and applies the
//! results it reports back. The crate itself spawns no background work.
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
