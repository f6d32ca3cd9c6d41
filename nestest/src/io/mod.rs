//! Side-effecting helpers: configuration files and isolated subprocesses.

pub mod config;
pub mod isolation;
pub mod process;
