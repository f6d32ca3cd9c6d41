//! Diagnostic tracing for the engine.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: engine diagnostics via `RUST_LOG` or
//!   `--log-level`, written to stderr.
//! - **Reporting (`report`)**: the per-unit result lines on stdout. Always
//!   written, unaffected by the log level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

/// Initialize the tracing subscriber.
///
/// `level` wins over `RUST_LOG`; without either the filter is `warn`.
/// Calling it again in the same process keeps the first subscriber.
///
/// # Example
/// ```bash
/// RUST_LOG=nestest=debug cargo run --bin nestest-fixture
/// ```
pub fn init(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
