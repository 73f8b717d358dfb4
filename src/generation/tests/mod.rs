//! Unit tests for generation coordination.

mod coordinator_tests;
