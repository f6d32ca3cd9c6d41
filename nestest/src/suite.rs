//! The user-facing suite: declare root tests, then hand control to [`Suite::main`].
//!
//! ```no_run
//! use nestest::Suite;
//!
//! fn main() -> std::process::ExitCode {
//!     let suite = Suite::new();
//!     suite.test("math", |s| {
//!         let divisor = std::hint::black_box(0u32);
//!         s.check_eq(2 + 2, 4);
//!         s.section_expect_fail("divide_by_zero", |_| {
//!             let _ = 10 / divisor;
//!         });
//!     });
//!     suite.main()
//! }
//! ```

use std::cell::RefCell;
use std::panic::Location;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use termcolor::WriteColor;
use tracing::{info, warn};

use crate::cli::SuiteArgs;
use crate::core::outcome::REJECTION_MARKER;
use crate::core::resolver;
use crate::core::tree::UnitTree;
use crate::core::unit::{UnitId, UnitOptions};
use crate::engine::{self, RootBody, Scope, Shared, SuiteState};
use crate::error::EngineError;
use crate::exit_codes;
use crate::io::config::{SuiteConfig, load_config};
use crate::io::isolation::Isolator;
use crate::logging;
use crate::options::RunOptions;

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub suite_passed: bool,
    pub passed: usize,
    pub failed: usize,
    /// For isolated runs, whether the target unit was reached.
    pub target_reached: Option<bool>,
}

impl RunSummary {
    pub fn exit_code(&self) -> i32 {
        if self.target_reached == Some(false) {
            exit_codes::TARGET_MISSING
        } else if self.suite_passed {
            exit_codes::OK
        } else {
            exit_codes::FAILED
        }
    }
}

/// A root test as seen by an external test orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedTest {
    pub name: String,
    pub source_file: String,
    pub working_dir: PathBuf,
    pub expect_fail: bool,
}

/// Registry of root tests plus the state of the current run.
///
/// Cloning yields another handle to the same suite.
#[derive(Clone)]
pub struct Suite {
    shared: Shared,
}

impl Default for Suite {
    fn default() -> Self {
        Self::new()
    }
}

impl Suite {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(SuiteState::new())),
        }
    }

    /// Replace the isolator used for expect-fail units.
    pub fn with_isolator(self, isolator: Rc<dyn Isolator>) -> Self {
        self.shared.borrow_mut().isolator = isolator;
        self
    }

    /// Declare a root test.
    #[track_caller]
    pub fn test<F>(&self, name: &str, body: F) -> &Self
    where
        F: Fn(&mut Scope<'_>) + 'static,
    {
        self.test_with(name, UnitOptions::new(), body)
    }

    /// Declare a root test that passes only if its body fails.
    #[track_caller]
    pub fn test_expect_fail<F>(&self, name: &str, body: F) -> &Self
    where
        F: Fn(&mut Scope<'_>) + 'static,
    {
        self.test_with(name, UnitOptions::new().expect_fail(), body)
    }

    /// Declare a root test with explicit options.
    ///
    /// Declaration errors (empty or duplicate name, declaring from inside a
    /// running body) are fatal: they stop the run and surface from
    /// [`Suite::run`].
    #[track_caller]
    pub fn test_with<F>(&self, name: &str, options: UnitOptions, body: F) -> &Self
    where
        F: Fn(&mut Scope<'_>) + 'static,
    {
        let source_file = Location::caller().file();
        let mut guard = self.shared.borrow_mut();
        let state = &mut *guard;
        match resolver::declare_root(&mut state.tree, state.active, name, options, source_file) {
            Ok(id) => {
                let body: RootBody = Rc::new(body);
                state.bodies.push((id, body));
            }
            Err(err) => state.abort(err),
        }
        self
    }

    /// Inspect the unit tree.
    pub fn with_tree<R>(&self, f: impl FnOnce(&UnitTree) -> R) -> R {
        f(&self.shared.borrow().tree)
    }

    /// Root tests in declaration order.
    pub fn list(&self) -> Result<Vec<ListedTest>> {
        let working_dir = std::env::current_dir().context("read working directory")?;
        let state = self.shared.borrow();
        Ok(state
            .tree
            .roots()
            .iter()
            .map(|id| {
                let unit = state.tree.get(*id);
                ListedTest {
                    name: unit.friendly_name().to_string(),
                    source_file: unit.source_file().unwrap_or_default().to_string(),
                    working_dir: working_dir.clone(),
                    expect_fail: unit.expect_fail(),
                }
            })
            .collect())
    }

    /// Run the selected root tests, writing result lines to `out`.
    ///
    /// Every unit executes at most once per process, so a second run only
    /// reports what the first one did not reach.
    pub fn run(&self, options: RunOptions, out: Box<dyn WriteColor>) -> Result<RunSummary, EngineError> {
        {
            let mut state = self.shared.borrow_mut();
            if let Some(err) = state.error.clone() {
                return Err(err);
            }
            state.reporter.set_output(out);
            state.options = options;
        }

        let isolated = self.shared.borrow().options.isolated;
        let target_reached = if isolated {
            Some(self.run_isolated_target())
        } else {
            self.run_selected()?;
            None
        };

        let state = self.shared.borrow();
        if let Some(err) = state.error.clone() {
            return Err(err);
        }
        let (passed, failed) = state.reporter.counts();
        Ok(RunSummary {
            suite_passed: state.reporter.suite_passed(),
            passed,
            failed,
            target_reached,
        })
    }

    fn run_selected(&self) -> Result<(), EngineError> {
        let roots = self.selected_roots()?;
        for (root, body) in roots {
            engine::execute(&self.shared, root, &mut |scope: &mut Scope<'_>| body(scope));
            if self.shared.borrow().aborted() {
                break;
            }
        }
        Ok(())
    }

    fn selected_roots(&self) -> Result<Vec<(UnitId, RootBody)>, EngineError> {
        let state = self.shared.borrow();
        if state.tree.is_empty() {
            warn!("suite declares no tests");
        }
        let selection = &state.options.selection;
        if let Some(unknown) = selection
            .names
            .iter()
            .find(|name| state.tree.root_named(name).is_none())
        {
            return Err(EngineError::UnknownTest(unknown.clone()));
        }
        Ok(state
            .bodies
            .iter()
            .filter(|(id, _)| selection.matches(state.tree.get(*id).friendly_name()))
            .map(|(id, body)| (*id, Rc::clone(body)))
            .collect())
    }

    fn run_isolated_target(&self) -> bool {
        let (target, root) = {
            let state = self.shared.borrow();
            let target = state.options.target.clone();
            let root = target
                .first()
                .and_then(|name| state.tree.root_named(name))
                .and_then(|id| state.body(id).map(|body| (id, body)));
            (target, root)
        };
        let Some((root, body)) = root else {
            return false;
        };
        info!(target = %target.join("/"), "running isolated unit");
        engine::navigate_to(&self.shared, root, &body, &target[1..]);
        self.shared.borrow().target_reached
    }

    /// Process entry point: parse arguments, load configuration, run, and
    /// turn the outcome into an exit code.
    ///
    /// An isolated run that refuses its invocation prints
    /// [`REJECTION_MARKER`] so the parent can tell it apart from a unit that
    /// exits with the same code.
    pub fn main(&self) -> ExitCode {
        let args = match SuiteArgs::try_parse() {
            Ok(args) => args,
            Err(err) => {
                let _ = err.print();
                if !err.use_stderr() {
                    return exit_code(exit_codes::OK);
                }
                if std::env::args_os().any(|arg| arg == "--isolated") {
                    eprintln!("{REJECTION_MARKER}");
                }
                return exit_code(exit_codes::INVALID);
            }
        };

        let code = match self.main_with_args(&args) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("{err:#}");
                let code = error_exit_code(&err);
                if args.isolated && code == exit_codes::INVALID {
                    eprintln!("{REJECTION_MARKER}");
                }
                code
            }
        };
        exit_code(code)
    }

    /// [`Suite::main`] with already parsed arguments.
    pub fn main_with_args(&self, args: &SuiteArgs) -> Result<i32> {
        logging::init(args.log_level);

        let config_path = args.config_path();
        let config = match &config_path {
            Some(path) => load_config(path)?,
            None => SuiteConfig::default(),
        };

        if args.list {
            for test in self.list()? {
                println!("{}", serde_json::to_string(&test).context("serialize test listing")?);
            }
            return Ok(exit_codes::OK);
        }

        let options = RunOptions::resolve(args, &config, config_path)?;
        let color = options.color;
        let summary = self.run(options, Box::new(termcolor::StandardStream::stdout(color)))?;
        info!(
            units = self.with_tree(UnitTree::len),
            passed = summary.passed,
            failed = summary.failed,
            suite_passed = summary.suite_passed,
            "suite finished"
        );
        Ok(summary.exit_code())
    }
}

/// A corrupted unit tree is an engine fault; every other error is a problem
/// with how the suite was declared or invoked.
fn error_exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<EngineError>() {
        Some(engine) if !engine.is_configuration() => exit_codes::FAILED,
        _ => exit_codes::INVALID,
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
