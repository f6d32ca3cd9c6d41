//! Stable exit codes for suite processes.

/// Every executed unit passed.
pub const OK: i32 = 0;
/// At least one unit failed unexpectedly.
pub const FAILED: i32 = 1;
/// Invalid command line, configuration, or suite declaration.
pub const INVALID: i32 = 2;
/// An isolated run could not reach the unit it was asked to execute.
pub const TARGET_MISSING: i32 = 3;
