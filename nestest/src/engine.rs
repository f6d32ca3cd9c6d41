//! Discover-then-descend execution of the unit tree.
//!
//! Executing a unit runs its body once in the *discover* pass: section
//! declarations register children without running them, assertions record
//! failures. The unit's result is printed, then the body is replayed in the
//! *descend* pass: every declaration now resolves to its registered child and
//! executes it. Execution is idempotent, so leaves run exactly once while each
//! ancestor body is replayed once per level.
//!
//! Section bodies are borrowed closures created anew by every run of the
//! enclosing body, which lets them borrow the enclosing body's fixtures.
//!
//! Inside an isolated run a third pass, *navigate*, replays ancestor bodies
//! only to follow the declarations leading to the target unit.

use std::cell::RefCell;
use std::fmt::Display;
use std::panic::Location;
use std::rc::Rc;

use tracing::{debug, error, trace, warn};

use crate::core::resolver::{self, Declaration};
use crate::core::tree::UnitTree;
use crate::core::unit::{UnitId, UnitOptions};
use crate::error::EngineError;
use crate::io::isolation::{IsolationRequest, Isolator, SubprocessIsolator};
use crate::options::RunOptions;
use crate::report::Reporter;

pub(crate) type Shared = Rc<RefCell<SuiteState>>;

/// Body of a root test. Stored because the engine replays it.
pub(crate) type RootBody = Rc<dyn Fn(&mut Scope<'_>)>;

/// All mutable state of one suite process.
pub(crate) struct SuiteState {
    pub tree: UnitTree,
    pub bodies: Vec<(UnitId, RootBody)>,
    /// Unit whose body is running; `None` at suite level.
    pub active: Option<UnitId>,
    pub options: RunOptions,
    pub reporter: Reporter,
    pub isolator: Rc<dyn Isolator>,
    /// First configuration error; stops the run at the next unit boundary.
    pub error: Option<EngineError>,
    pub target_reached: bool,
}

impl SuiteState {
    pub fn new() -> Self {
        Self {
            tree: UnitTree::new(),
            bodies: Vec::new(),
            active: None,
            options: RunOptions::default(),
            reporter: Reporter::stdout(termcolor::ColorChoice::Auto),
            isolator: Rc::new(SubprocessIsolator::new()),
            error: None,
            target_reached: false,
        }
    }

    pub fn body(&self, root: UnitId) -> Option<RootBody> {
        self.bodies
            .iter()
            .find(|(id, _)| *id == root)
            .map(|(_, body)| Rc::clone(body))
    }

    pub fn aborted(&self) -> bool {
        self.error.is_some()
    }

    pub fn abort(&mut self, err: EngineError) {
        error!(err = %err, "aborting suite");
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn declare_section(&mut self, parent: UnitId, name: &str, options: UnitOptions) -> Option<Declaration> {
        match resolver::declare_section(&mut self.tree, parent, name, options) {
            Ok(declaration) => Some(declaration),
            Err(err) => {
                self.abort(err);
                None
            }
        }
    }
}

/// Which pass a body is being run for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass<'p> {
    Discover,
    Descend,
    /// Remaining path segments below the current unit.
    Navigate(&'p [String]),
}

/// Handle given to every test and section body.
///
/// Declares nested sections and records failures against the unit whose body
/// is running.
pub struct Scope<'s> {
    shared: &'s Shared,
    unit: UnitId,
    pass: Pass<'s>,
    debug: bool,
}

impl<'s> Scope<'s> {
    fn new(shared: &'s Shared, unit: UnitId, pass: Pass<'s>, debug: bool) -> Self {
        Self {
            shared,
            unit,
            pass,
            debug,
        }
    }

    /// Declare a nested section.
    pub fn section<F>(&mut self, name: &str, body: F)
    where
        F: FnMut(&mut Scope<'_>),
    {
        self.section_with(name, UnitOptions::new(), body);
    }

    /// Declare a nested section that passes only if its body fails.
    pub fn section_expect_fail<F>(&mut self, name: &str, body: F)
    where
        F: FnMut(&mut Scope<'_>),
    {
        self.section_with(name, UnitOptions::new().expect_fail(), body);
    }

    /// Declare a nested section with explicit options.
    ///
    /// Options take effect on the first declaration; replays keep them.
    pub fn section_with<F>(&mut self, name: &str, options: UnitOptions, mut body: F)
    where
        F: FnMut(&mut Scope<'_>),
    {
        if self.shared.borrow().aborted() {
            return;
        }
        match self.pass {
            Pass::Navigate(remaining) => self.navigate(name, options, remaining, &mut body),
            Pass::Discover => {
                // A name already known here was declared twice by this body;
                // it resolves to the same child and runs in the descend pass.
                let _ = self.shared.borrow_mut().declare_section(self.unit, name, options);
            }
            Pass::Descend => {
                let declared = self.shared.borrow_mut().declare_section(self.unit, name, options);
                let child = match declared {
                    Some(Declaration::Known(child)) => child,
                    Some(Declaration::Registered(child)) => {
                        warn!(section = name, "section first declared during replay");
                        child
                    }
                    None => return,
                };
                execute(self.shared, child, &mut body);
            }
        }
    }

    fn navigate(
        &mut self,
        name: &str,
        options: UnitOptions,
        remaining: &'s [String],
        body: &mut dyn FnMut(&mut Scope<'_>),
    ) {
        let Some((next, rest)) = remaining.split_first() else {
            return;
        };
        if next != name || self.shared.borrow().target_reached {
            return;
        }
        let declared = self.shared.borrow_mut().declare_section(self.unit, name, options);
        let Some(child) = declared.map(Declaration::unit) else {
            return;
        };

        if rest.is_empty() {
            debug!(section = name, "reached isolation target");
            self.shared.borrow_mut().target_reached = true;
            execute(self.shared, child, body);
            return;
        }
        let debug = {
            let state = self.shared.borrow();
            state.tree.effective_debug(child, state.options.debug)
        };
        let _active = ActiveUnit::enter(self.shared, child);
        let mut scope = Scope::new(self.shared, child, Pass::Navigate(rest), debug);
        body(&mut scope);
    }

    /// Record a failure unless `condition` holds. Returns `condition`.
    #[track_caller]
    pub fn check(&mut self, condition: bool, message: impl Display) -> bool {
        if !condition {
            self.record(message.to_string(), Location::caller());
        }
        condition
    }

    /// Record a failure unless `left == right`. Returns whether they are equal.
    #[track_caller]
    pub fn check_eq<T>(&mut self, left: T, right: T) -> bool
    where
        T: PartialEq + std::fmt::Debug,
    {
        let equal = left == right;
        if !equal {
            self.record(
                format!("expected `{left:?}` to equal `{right:?}`"),
                Location::caller(),
            );
        }
        equal
    }

    /// Record an unconditional failure.
    #[track_caller]
    pub fn fail(&mut self, message: impl Display) {
        self.record(message.to_string(), Location::caller());
    }

    /// Print a diagnostic when the unit runs in debug mode.
    pub fn debug(&mut self, message: impl Display) {
        if !self.debug || self.pass != Pass::Discover {
            return;
        }
        let mut state = self.shared.borrow_mut();
        let depth = state.tree.get(self.unit).section_depth();
        state.reporter.diagnostic(depth, &message.to_string());
    }

    pub fn name(&self) -> String {
        self.shared.borrow().tree.get(self.unit).friendly_name().to_string()
    }

    pub fn depth(&self) -> usize {
        self.shared.borrow().tree.get(self.unit).section_depth()
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// True inside an isolated run of an expect-fail unit.
    pub fn is_isolated(&self) -> bool {
        self.shared.borrow().options.isolated
    }

    /// True while the body is replayed to reach its children.
    pub fn is_replay(&self) -> bool {
        self.pass != Pass::Discover
    }

    fn record(&mut self, message: String, location: &Location<'_>) {
        if self.pass != Pass::Discover {
            return;
        }
        let mut state = self.shared.borrow_mut();
        trace!(unit = %self.unit, message = %message, "failure recorded");
        state
            .tree
            .get_mut(self.unit)
            .record_failure(format!("{message} ({}:{})", location.file(), location.line()));
    }
}

/// Sets the suite's active unit and restores the previous one on drop,
/// including while unwinding.
struct ActiveUnit<'a> {
    shared: &'a Shared,
    previous: Option<UnitId>,
}

impl<'a> ActiveUnit<'a> {
    fn enter(shared: &'a Shared, unit: UnitId) -> Self {
        let previous = shared.borrow_mut().active.replace(unit);
        Self { shared, previous }
    }
}

impl Drop for ActiveUnit<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.try_borrow_mut() {
            state.active = self.previous;
        }
    }
}

/// Execute `unit` once: run or isolate its body, print its result, then
/// replay the body to execute its children. Later calls are no-ops.
pub(crate) fn execute(shared: &Shared, unit: UnitId, body: &mut dyn FnMut(&mut Scope<'_>)) {
    let (isolate, debug) = {
        let mut state = shared.borrow_mut();
        if state.aborted() || !state.tree.get_mut(unit).begin_execution() {
            return;
        }
        let expect_fail = state.tree.get(unit).expect_fail();
        let debug = state.tree.effective_debug(unit, state.options.debug);
        (expect_fail && !state.options.isolated, debug)
    };
    debug!(unit = %unit, isolate, "executing unit");

    let _active = ActiveUnit::enter(shared, unit);
    if isolate {
        run_isolated(shared, unit, debug);
    } else {
        let mut scope = Scope::new(shared, unit, Pass::Discover, debug);
        body(&mut scope);
    }

    let descend = {
        let mut guard = shared.borrow_mut();
        let state = &mut *guard;
        if state.aborted() {
            return;
        }
        state.tree.get_mut(unit).finish_execution();
        let default_width = state.options.default_print_width;
        state
            .reporter
            .print_result(&mut state.tree, unit, default_width);
        !isolate && !state.tree.get(unit).is_leaf_level()
    };

    if descend {
        let mut scope = Scope::new(shared, unit, Pass::Descend, debug);
        body(&mut scope);
        fail_unreached_children(shared, unit);
    }
}

/// Children registered by the discover pass but not declared again during the
/// replay never ran. Report each one as failed so it cannot pass silently.
fn fail_unreached_children(shared: &Shared, unit: UnitId) {
    let mut guard = shared.borrow_mut();
    let state = &mut *guard;
    if state.aborted() {
        return;
    }
    let unreached: Vec<UnitId> = state
        .tree
        .get(unit)
        .children()
        .iter()
        .copied()
        .filter(|child| !state.tree.get(*child).has_executed())
        .collect();
    let default_width = state.options.default_print_width;
    for child in unreached {
        warn!(unit = %child, "section was not declared again during replay");
        state.tree.get_mut(child).record_failure(
            "section never ran: its parent did not declare it again when replayed",
        );
        state.reporter.print_result(&mut state.tree, child, default_width);
    }
}

/// Run `root`'s body in the navigate pass towards `path` (which excludes the
/// root's own name). An empty path executes the root itself.
pub(crate) fn navigate_to(shared: &Shared, root: UnitId, body: &RootBody, path: &[String]) {
    if path.is_empty() {
        shared.borrow_mut().target_reached = true;
        execute(shared, root, &mut |scope: &mut Scope<'_>| body(scope));
        return;
    }
    let debug = {
        let state = shared.borrow();
        state.tree.effective_debug(root, state.options.debug)
    };
    let _active = ActiveUnit::enter(shared, root);
    let mut scope = Scope::new(shared, root, Pass::Navigate(path), debug);
    body(&mut scope);
}

fn run_isolated(shared: &Shared, unit: UnitId, debug: bool) {
    let (isolator, request) = {
        let state = shared.borrow();
        let request = IsolationRequest {
            unit_path: state.tree.path(unit),
            print_width: state.options.default_print_width,
            debug,
            timeout: state.options.isolation_timeout,
            output_limit_bytes: state.options.output_limit_bytes,
            config_path: state.options.config_path.clone(),
        };
        (Rc::clone(&state.isolator), request)
    };

    let outcome = isolator.isolate(&request);
    debug!(unit = %unit, expectation_met = outcome.expectation_met(), "isolation finished");

    let mut guard = shared.borrow_mut();
    let state = &mut *guard;
    if debug && let Some(output) = outcome.output() {
        let depth = state.tree.get(unit).section_depth();
        state.reporter.replay(depth, output);
    }
    for message in outcome.failure_messages() {
        state.tree.get_mut(unit).record_failure(message);
    }
}
