//! Run options resolved from the command line and the config file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use regex::Regex;
use termcolor::ColorChoice;

use crate::cli::{ColorMode, SuiteArgs};
use crate::io::config::SuiteConfig;

/// Which root tests a run executes. Empty selects every root.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub names: Vec<String>,
    pub filter: Option<Regex>,
}

impl Selection {
    pub fn matches(&self, name: &str) -> bool {
        let by_name = self.names.is_empty() || self.names.iter().any(|n| n == name);
        let by_filter = self.filter.as_ref().is_none_or(|re| re.is_match(name));
        by_name && by_filter
    }
}

/// Read-only inputs to the engine, fixed at process start.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub default_print_width: usize,
    pub debug: bool,
    /// This process is an isolated run of one expect-fail unit.
    pub isolated: bool,
    /// Unit path of the isolated run, root first.
    pub target: Vec<String>,
    pub selection: Selection,
    pub isolation_timeout: Duration,
    pub output_limit_bytes: usize,
    pub config_path: Option<PathBuf>,
    pub color: ColorChoice,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&SuiteConfig::default())
    }
}

impl RunOptions {
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            default_print_width: config.print_width,
            debug: config.debug,
            isolated: false,
            target: Vec::new(),
            selection: Selection::default(),
            isolation_timeout: Duration::from_secs(config.isolation_timeout_secs),
            output_limit_bytes: config.output_limit_bytes,
            config_path: None,
            color: ColorChoice::Auto,
        }
    }

    /// Options for an isolated run of the unit at `path`.
    pub fn isolated(path: &[&str]) -> Self {
        Self {
            isolated: true,
            target: path.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Apply command-line flags over the loaded config.
    pub fn resolve(
        args: &SuiteArgs,
        config: &SuiteConfig,
        config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let mut options = Self::from_config(config);
        options.config_path = config_path;

        if let Some(width) = args.print_width {
            if width == 0 {
                bail!("--print-width must be > 0");
            }
            options.default_print_width = width;
        }
        if let Some(secs) = args.timeout_secs {
            if secs == 0 {
                bail!("--timeout-secs must be > 0");
            }
            options.isolation_timeout = Duration::from_secs(secs);
        }
        options.debug |= args.debug;

        options.isolated = args.isolated;
        options.target = args.unit.clone();
        if options.isolated && options.target.is_empty() {
            bail!("--isolated requires at least one --unit");
        }
        if !options.isolated && !options.target.is_empty() {
            bail!("--unit is only valid together with --isolated");
        }

        options.selection.names = args.tests.clone();
        if let Some(pattern) = &args.filter {
            let re = Regex::new(pattern).with_context(|| format!("compile --filter {pattern}"))?;
            options.selection.filter = Some(re);
        }

        options.color = match args.color {
            _ if options.isolated => ColorChoice::Never,
            ColorMode::Auto => ColorChoice::Auto,
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
        };
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> SuiteArgs {
        SuiteArgs::parse_from(std::iter::once("suite").chain(argv.iter().copied()))
    }

    #[test]
    fn flags_override_config() {
        let config = SuiteConfig {
            print_width: 100,
            isolation_timeout_secs: 9,
            ..SuiteConfig::default()
        };
        let options =
            RunOptions::resolve(&args(&["--print-width", "60", "--debug"]), &config, None)
                .expect("resolve");
        assert_eq!(options.default_print_width, 60);
        assert!(options.debug);
        assert_eq!(options.isolation_timeout, Duration::from_secs(9));
    }

    #[test]
    fn config_width_applies_without_flag() {
        let config = SuiteConfig {
            print_width: 100,
            ..SuiteConfig::default()
        };
        let options = RunOptions::resolve(&args(&[]), &config, None).expect("resolve");
        assert_eq!(options.default_print_width, 100);
        assert!(!options.isolated);
    }

    #[test]
    fn isolated_requires_unit_path() {
        let err = RunOptions::resolve(&args(&["--isolated"]), &SuiteConfig::default(), None)
            .unwrap_err();
        assert!(err.to_string().contains("--unit"));

        let options = RunOptions::resolve(
            &args(&["--isolated", "--unit=math", "--unit=divide_by_zero"]),
            &SuiteConfig::default(),
            None,
        )
        .expect("resolve");
        assert_eq!(options.target, vec!["math", "divide_by_zero"]);
        assert_eq!(options.color, ColorChoice::Never);
    }

    #[test]
    fn selection_combines_names_and_filter() {
        let options = RunOptions::resolve(
            &args(&["--test", "math", "--test", "strings", "--filter", "^ma"]),
            &SuiteConfig::default(),
            None,
        )
        .expect("resolve");
        assert!(options.selection.matches("math"));
        assert!(!options.selection.matches("strings"));
        assert!(!options.selection.matches("matrix"));
    }

    #[test]
    fn bad_filter_is_an_error() {
        let err = RunOptions::resolve(&args(&["--filter", "("]), &SuiteConfig::default(), None)
            .unwrap_err();
        assert!(err.to_string().starts_with("compile --filter"));
    }
}
