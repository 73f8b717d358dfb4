//! Unit tests for the workflow module.
//!
//! Domain tests drive a [`crate::workflow::domain::ProjectBoard`] directly;
//! service tests run against the in-memory repository.
