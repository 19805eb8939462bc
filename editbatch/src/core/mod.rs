//! Deterministic, pure logic shared by the batch core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod flags;
pub mod lengths;
pub mod shape;
pub mod types;
