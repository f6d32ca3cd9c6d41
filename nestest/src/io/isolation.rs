//! Fault isolation for expect-fail units.
//!
//! A fatal fault (abort, stack overflow, a panic that cannot unwind) takes the
//! whole process down, so an expect-fail unit runs in a fresh copy of the
//! suite process. The [`Isolator`] trait decouples the engine from process
//! spawning; tests use scripted isolators that return predetermined outcomes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::core::outcome::{CapturedOutput, IsolationOutcome};
use crate::io::process::run_command_with_timeout;

/// Everything an isolated run inherits from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationRequest {
    /// Friendly names from the root test down to the unit.
    pub unit_path: Vec<String>,
    /// Configured default report width.
    pub print_width: usize,
    /// Effective debug mode of the unit.
    pub debug: bool,
    /// Kill the run after this long.
    pub timeout: Duration,
    /// Keep at most this many bytes of each output stream.
    pub output_limit_bytes: usize,
    /// Config file the parent loaded, if any.
    pub config_path: Option<PathBuf>,
}

/// Runs one unit in isolation and reports how the run ended.
pub trait Isolator {
    fn isolate(&self, request: &IsolationRequest) -> IsolationOutcome;
}

/// Isolator that re-invokes the suite executable.
#[derive(Debug, Clone, Default)]
pub struct SubprocessIsolator {
    program: Option<PathBuf>,
}

impl SubprocessIsolator {
    /// Re-invoke the current executable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-invoke a specific suite executable instead of the current one.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    fn program(&self) -> std::io::Result<PathBuf> {
        match &self.program {
            Some(path) => Ok(path.clone()),
            None => std::env::current_exe(),
        }
    }
}

impl Isolator for SubprocessIsolator {
    #[instrument(skip_all, fields(unit = %request.unit_path.join("/")))]
    fn isolate(&self, request: &IsolationRequest) -> IsolationOutcome {
        let program = match self.program() {
            Ok(program) => program,
            Err(err) => {
                return IsolationOutcome::LaunchFailed {
                    reason: format!("locate suite executable: {err}"),
                };
            }
        };

        info!(program = %program.display(), "starting isolated run");
        let cmd = isolated_command(program, request);
        let output =
            match run_command_with_timeout(cmd, request.timeout, request.output_limit_bytes) {
                Ok(output) => output,
                Err(err) => {
                    return IsolationOutcome::LaunchFailed {
                        reason: format!("{err:#}"),
                    };
                }
            };

        let captured = CapturedOutput::new(output.stdout_lossy(), output.stderr_lossy());
        let outcome = if output.timed_out {
            IsolationOutcome::TimedOut {
                timeout: request.timeout,
                output: captured,
            }
        } else {
            IsolationOutcome::from_exit(output.status.code(), captured)
        };
        debug!(expectation_met = outcome.expectation_met(), "isolated run finished");
        outcome
    }
}

/// Build the command line of the isolated-run contract.
pub fn isolated_command(program: PathBuf, request: &IsolationRequest) -> Command {
    let mut cmd = Command::new(program);
    cmd.arg("--isolated")
        .arg("--color")
        .arg("never")
        .arg("--print-width")
        .arg(request.print_width.to_string())
        .arg("--timeout-secs")
        .arg(request.timeout.as_secs().max(1).to_string());
    for segment in &request.unit_path {
        cmd.arg(format!("--unit={segment}"));
    }
    if request.debug {
        cmd.arg("--debug");
    }
    if let Some(path) = &request.config_path {
        cmd.arg("--config").arg(path);
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> IsolationRequest {
        IsolationRequest {
            unit_path: vec!["math".to_string(), "-odd name".to_string()],
            print_width: 60,
            debug: true,
            timeout: Duration::from_secs(30),
            output_limit_bytes: 1000,
            config_path: Some(PathBuf::from("nestest.toml")),
        }
    }

    #[test]
    fn command_carries_path_and_inherited_settings() {
        let cmd = isolated_command(PathBuf::from("/bin/suite"), &request());
        let args: Vec<String> = cmd
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--isolated",
                "--color",
                "never",
                "--print-width",
                "60",
                "--timeout-secs",
                "30",
                "--unit=math",
                "--unit=-odd name",
                "--debug",
                "--config",
                "nestest.toml",
            ]
        );
    }

    #[test]
    fn missing_program_is_a_launch_failure() {
        let isolator = SubprocessIsolator::with_program("/nonexistent/nestest-suite");
        let outcome = isolator.isolate(&request());
        assert!(matches!(outcome, IsolationOutcome::LaunchFailed { .. }));
        assert!(!outcome.expectation_met());
    }
}
