//! Command line of a suite executable.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::io::config::CONFIG_ENV;

#[derive(Debug, Parser)]
#[command(about = "Run a nestest suite", disable_version_flag = true)]
pub struct SuiteArgs {
    /// Run only the named root test. Repeatable.
    #[arg(long = "test", value_name = "NAME")]
    pub tests: Vec<String>,

    /// Run only root tests whose name matches this regex.
    #[arg(long, value_name = "REGEX")]
    pub filter: Option<String>,

    /// Print one JSON line per root test and exit.
    #[arg(long)]
    pub list: bool,

    /// Report line width for units that do not force their own.
    #[arg(long, value_name = "COLUMNS")]
    pub print_width: Option<usize>,

    /// Print debug diagnostics from test bodies.
    #[arg(long)]
    pub debug: bool,

    /// Kill an isolated run after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Config file (TOML). Defaults to `$NESTEST_CONFIG` when set.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Diagnostic log level (overrides `RUST_LOG`).
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Run as the isolated subprocess of an expect-fail unit.
    #[arg(long, hide = true)]
    pub isolated: bool,

    /// One path segment of the unit to isolate, root first. Repeatable.
    #[arg(long, value_name = "NAME", hide = true, allow_hyphen_values = true)]
    pub unit: Vec<String>,
}

impl SuiteArgs {
    /// `--config`, else `$NESTEST_CONFIG`.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let args = SuiteArgs::parse_from(["suite"]);
        assert!(args.tests.is_empty());
        assert!(!args.list);
        assert!(!args.isolated);
        assert_eq!(args.color, ColorMode::Auto);
        assert_eq!(args.print_width, None);
    }

    #[test]
    fn parse_isolated_invocation() {
        let args = SuiteArgs::parse_from([
            "suite",
            "--isolated",
            "--unit=math",
            "--unit=-negative",
            "--print-width",
            "60",
            "--debug",
        ]);
        assert!(args.isolated);
        assert_eq!(args.unit, vec!["math", "-negative"]);
        assert_eq!(args.print_width, Some(60));
        assert!(args.debug);
    }

    #[test]
    fn parse_selection_and_log_level() {
        let args = SuiteArgs::parse_from([
            "suite",
            "--test",
            "math",
            "--test",
            "strings",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.tests, vec!["math", "strings"]);
        assert_eq!(args.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn explicit_config_wins() {
        let args = SuiteArgs::parse_from(["suite", "--config", "custom.toml"]);
        assert_eq!(args.config_path(), Some(PathBuf::from("custom.toml")));
    }
}
