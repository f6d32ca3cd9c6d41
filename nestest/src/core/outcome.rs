//! Interpretation of an isolated run's termination.
//!
//! Only this value crosses the process boundary; the subprocess's own unit
//! tree is discarded with the process.

use std::time::Duration;

use crate::exit_codes;

/// Line an isolated run prints on stderr before exiting with
/// [`exit_codes::INVALID`] because it refused its invocation. Without it,
/// exit code 2 is an ordinary crash of the unit under test.
pub const REJECTION_MARKER: &str = "nestest: isolated invocation rejected";

/// Output captured from an isolated run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }

    /// Non-empty streams as `(label, text)` pairs.
    pub fn streams(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [("stdout", self.stdout.as_str()), ("stderr", self.stderr.as_str())]
            .into_iter()
            .filter(|(_, text)| !text.trim().is_empty())
    }

    /// True when stderr carries [`REJECTION_MARKER`] on a line of its own.
    pub fn has_rejection_marker(&self) -> bool {
        self.stderr.lines().any(|line| line == REJECTION_MARKER)
    }
}

/// How an isolated run of an expect-fail unit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsolationOutcome {
    /// Non-zero exit or killed by a signal: the expected failure happened.
    Crashed {
        exit_code: Option<i32>,
        output: CapturedOutput,
    },
    /// Exit code 0: the unit unexpectedly succeeded.
    CleanExit { output: CapturedOutput },
    /// Killed after the timeout. Never counts as the expected failure.
    TimedOut {
        timeout: Duration,
        output: CapturedOutput,
    },
    /// The run could not find the unit path it was given.
    TargetMissing { output: CapturedOutput },
    /// The run exited with [`exit_codes::INVALID`] after printing
    /// [`REJECTION_MARKER`]: it refused its command line or configuration.
    Rejected { output: CapturedOutput },
    /// The subprocess could not be started.
    LaunchFailed { reason: String },
}

impl IsolationOutcome {
    /// Classify a finished (not timed out) run by its exit code.
    /// `None` means the process was terminated by a signal.
    pub fn from_exit(exit_code: Option<i32>, output: CapturedOutput) -> Self {
        match exit_code {
            Some(exit_codes::OK) => IsolationOutcome::CleanExit { output },
            Some(exit_codes::TARGET_MISSING) => IsolationOutcome::TargetMissing { output },
            Some(exit_codes::INVALID) if output.has_rejection_marker() => {
                IsolationOutcome::Rejected { output }
            }
            code => IsolationOutcome::Crashed {
                exit_code: code,
                output,
            },
        }
    }

    pub fn expectation_met(&self) -> bool {
        matches!(self, IsolationOutcome::Crashed { .. })
    }

    pub fn output(&self) -> Option<&CapturedOutput> {
        match self {
            IsolationOutcome::Crashed { output, .. }
            | IsolationOutcome::CleanExit { output }
            | IsolationOutcome::TimedOut { output, .. }
            | IsolationOutcome::TargetMissing { output }
            | IsolationOutcome::Rejected { output } => Some(output),
            IsolationOutcome::LaunchFailed { .. } => None,
        }
    }

    /// Failure records for the unit; empty when the expectation was met.
    pub fn failure_messages(&self) -> Vec<String> {
        let headline = match self {
            IsolationOutcome::Crashed { .. } => return Vec::new(),
            IsolationOutcome::CleanExit { .. } => {
                "expected failure did not occur: isolated run exited successfully".to_string()
            }
            IsolationOutcome::TimedOut { timeout, .. } => format!(
                "isolated run timed out after {}s; a timeout is not the expected failure",
                timeout.as_secs()
            ),
            IsolationOutcome::TargetMissing { .. } => {
                "isolated run could not reach this unit".to_string()
            }
            IsolationOutcome::Rejected { .. } => {
                "isolated run rejected its invocation or configuration".to_string()
            }
            IsolationOutcome::LaunchFailed { reason } => {
                format!("could not launch isolated run: {reason}")
            }
        };

        let mut messages = vec![headline];
        if let Some(output) = self.output() {
            for (label, text) in output.streams() {
                messages.push(format!("captured {label}:\n{}", text.trim_end()));
            }
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonzero_exit_and_signal_meet_the_expectation() {
        let panicked = IsolationOutcome::from_exit(Some(101), CapturedOutput::default());
        let signalled = IsolationOutcome::from_exit(None, CapturedOutput::default());
        let recorded = IsolationOutcome::from_exit(Some(exit_codes::FAILED), CapturedOutput::default());
        for outcome in [panicked, signalled, recorded] {
            assert!(outcome.expectation_met(), "{outcome:?}");
            assert!(outcome.failure_messages().is_empty());
        }
    }

    #[test]
    fn clean_exit_fails_with_captured_output() {
        let outcome =
            IsolationOutcome::from_exit(Some(0), CapturedOutput::new("divide_by_zero ... PASSED\n", ""));
        assert!(!outcome.expectation_met());
        let messages = outcome.failure_messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("expected failure did not occur"));
        assert_eq!(messages[1], "captured stdout:\ndivide_by_zero ... PASSED");
    }

    #[test]
    fn timeout_is_never_the_expected_failure() {
        let outcome = IsolationOutcome::TimedOut {
            timeout: Duration::from_secs(5),
            output: CapturedOutput::default(),
        };
        assert!(!outcome.expectation_met());
        assert_eq!(
            outcome.failure_messages(),
            vec!["isolated run timed out after 5s; a timeout is not the expected failure"]
        );
    }

    #[test]
    fn protocol_exit_codes_are_not_crashes() {
        let missing =
            IsolationOutcome::from_exit(Some(exit_codes::TARGET_MISSING), CapturedOutput::default());
        let stderr = format!("error: --print-width must be > 0\n{REJECTION_MARKER}\n");
        let rejected =
            IsolationOutcome::from_exit(Some(exit_codes::INVALID), CapturedOutput::new("", stderr));
        assert!(matches!(missing, IsolationOutcome::TargetMissing { .. }));
        assert!(matches!(rejected, IsolationOutcome::Rejected { .. }));
        assert!(!missing.expectation_met());
        assert!(!rejected.expectation_met());
    }

    #[test]
    fn exit_two_without_marker_is_a_crash() {
        let exited = IsolationOutcome::from_exit(
            Some(exit_codes::INVALID),
            CapturedOutput::new("", "usage: tool <file>\n"),
        );
        assert!(matches!(exited, IsolationOutcome::Crashed { exit_code: Some(2), .. }));
        assert!(exited.expectation_met());

        let quoted = CapturedOutput::new("", format!("saw `{REJECTION_MARKER}` in a log\n"));
        assert!(!quoted.has_rejection_marker());
    }
}
