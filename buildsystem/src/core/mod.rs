//! Deterministic, pure logic for definitions and command templates.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod commands;
pub mod container;
pub mod identity;
pub mod response;
pub mod task_definition;
pub mod task_inputs;
pub mod types;
