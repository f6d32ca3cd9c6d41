//! Test-only helpers: in-memory report capture and scripted isolators.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

use termcolor::NoColor;

use crate::core::outcome::{CapturedOutput, IsolationOutcome};
use crate::error::EngineError;
use crate::io::isolation::{IsolationRequest, Isolator};
use crate::options::RunOptions;
use crate::suite::{RunSummary, Suite};

/// Shared in-memory sink for report output.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A colorless writer appending to this capture.
    pub fn sink(&self) -> NoColor<Capture> {
        NoColor::new(self.clone())
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for Capture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Isolator returning queued outcomes in order and recording every request.
///
/// Once the queue is empty it answers [`crashed`], the outcome of an expected
/// failure.
#[derive(Debug, Default)]
pub struct ScriptedIsolator {
    outcomes: RefCell<VecDeque<IsolationOutcome>>,
    requests: RefCell<Vec<IsolationRequest>>,
}

impl ScriptedIsolator {
    pub fn new(outcomes: Vec<IsolationOutcome>) -> Rc<Self> {
        Rc::new(Self {
            outcomes: RefCell::new(outcomes.into()),
            requests: RefCell::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<IsolationRequest> {
        self.requests.borrow().clone()
    }
}

impl Isolator for ScriptedIsolator {
    fn isolate(&self, request: &IsolationRequest) -> IsolationOutcome {
        self.requests.borrow_mut().push(request.clone());
        self.outcomes.borrow_mut().pop_front().unwrap_or_else(crashed)
    }
}

/// Outcome of an isolated run that panicked.
pub fn crashed() -> IsolationOutcome {
    IsolationOutcome::Crashed {
        exit_code: Some(101),
        output: CapturedOutput::new("", "thread 'main' panicked\n"),
    }
}

/// Outcome of an isolated run that exited cleanly.
pub fn clean_exit() -> IsolationOutcome {
    IsolationOutcome::CleanExit {
        output: CapturedOutput::new("unit ... PASSED\n", ""),
    }
}

/// Run `suite` with a colorless capture and return its result and output.
pub fn run_captured(
    suite: &Suite,
    options: RunOptions,
) -> (Result<RunSummary, EngineError>, Capture) {
    let capture = Capture::new();
    let result = suite.run(options, Box::new(capture.sink()));
    (result, capture)
}

/// Options with a fixed width so report lines are predictable.
pub fn options_with_width(width: usize) -> RunOptions {
    RunOptions {
        default_print_width: width,
        ..RunOptions::default()
    }
}
