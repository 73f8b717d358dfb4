//! Adapters for generation ports.

pub mod memory;
