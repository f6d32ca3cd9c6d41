//! Nested test execution with process isolation for expected failures.
//!
//! Tests are trees of sections. Every section body runs exactly once: a body
//! first runs to discover its sections, its result is printed, and it is then
//! replayed to execute them. Units declared as expected to fail run in a fresh
//! copy of the suite process, so a fatal fault proves the expectation instead
//! of taking the suite down.
//!
//! - **[`core`]**: pure tree logic (units, declaration resolution, outcome
//!   interpretation). No I/O.
//! - **[`io`]**: configuration files and isolated subprocesses.
//!
//! [`engine`] drives execution, [`report`] prints results, and [`Suite`] is the
//! entry point a suite executable calls from `main`.

pub mod cli;
pub mod core;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod options;
pub mod report;
pub mod suite;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::outcome::{CapturedOutput, IsolationOutcome};
pub use crate::core::unit::UnitOptions;
pub use crate::engine::Scope;
pub use crate::error::EngineError;
pub use crate::io::isolation::{IsolationRequest, Isolator, SubprocessIsolator};
pub use crate::options::RunOptions;
pub use crate::suite::{ListedTest, RunSummary, Suite};
