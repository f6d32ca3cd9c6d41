//! Deterministic, pure logic shared by the engine.
//!
//! Core modules are free of I/O. They operate on the in-memory unit tree and
//! return deterministic outputs suitable for tests.

pub mod outcome;
pub mod resolver;
pub mod tree;
pub mod unit;
