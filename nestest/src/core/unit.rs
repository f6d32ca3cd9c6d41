//! The execution unit: one node of the test tree (a root test or a section).

use std::collections::HashMap;
use std::fmt;

/// Opaque handle of a unit inside its [`crate::core::tree::UnitTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(usize);

impl UnitId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Execution state of a unit. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Unexecuted,
    Executing,
    Executed,
}

/// A failure recorded by a unit's own body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
}

/// Per-declaration settings for a test or section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitOptions {
    /// The unit passes only if its body fails.
    pub expect_fail: bool,
    /// Forced report width for this unit and its descendants.
    pub print_width: Option<usize>,
    /// Forced debug mode for this unit and its descendants.
    pub debug: Option<bool>,
}

impl UnitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_fail(mut self) -> Self {
        self.expect_fail = true;
        self
    }

    pub fn print_width(mut self, width: usize) -> Self {
        self.print_width = Some(width);
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = Some(enabled);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionUnit {
    id: UnitId,
    friendly_name: String,
    source_file: Option<String>,
    expect_fail: bool,
    parent: Option<UnitId>,
    children: Vec<UnitId>,
    child_key_index: HashMap<String, UnitId>,
    print_width: Option<usize>,
    section_depth: usize,
    debug_mode: Option<bool>,
    state: UnitState,
    has_printed: bool,
    failures: Vec<Failure>,
}

impl ExecutionUnit {
    /// Construct a detached unit: no parent, no children, depth 0, and width
    /// and debug mode inherited until [`ExecutionUnit::apply_options`] forces them.
    pub fn new(id: UnitId, friendly_name: impl Into<String>, expect_fail: bool) -> Self {
        Self {
            id,
            friendly_name: friendly_name.into(),
            source_file: None,
            expect_fail,
            parent: None,
            children: Vec::new(),
            child_key_index: HashMap::new(),
            print_width: None,
            section_depth: 0,
            debug_mode: None,
            state: UnitState::Unexecuted,
            has_printed: false,
            failures: Vec::new(),
        }
    }

    pub fn apply_options(&mut self, options: UnitOptions) {
        self.expect_fail = options.expect_fail;
        self.print_width = options.print_width;
        self.debug_mode = options.debug;
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub fn set_source_file(&mut self, path: impl Into<String>) {
        self.source_file = Some(path.into());
    }

    pub fn expect_fail(&self) -> bool {
        self.expect_fail
    }

    pub fn parent(&self) -> Option<UnitId> {
        self.parent
    }

    /// Children in declaration order.
    pub fn children(&self) -> &[UnitId] {
        &self.children
    }

    /// Child previously declared under `name`, if any.
    pub fn child_key(&self, name: &str) -> Option<UnitId> {
        self.child_key_index.get(name).copied()
    }

    /// Width forced on this unit itself (not inherited).
    pub fn forced_print_width(&self) -> Option<usize> {
        self.print_width
    }

    /// Debug mode forced on this unit itself (not inherited).
    pub fn forced_debug_mode(&self) -> Option<bool> {
        self.debug_mode
    }

    pub fn section_depth(&self) -> usize {
        self.section_depth
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn has_executed(&self) -> bool {
        self.state != UnitState::Unexecuted
    }

    pub fn has_printed(&self) -> bool {
        self.has_printed
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn is_leaf_level(&self) -> bool {
        self.children.is_empty()
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.failures.push(Failure {
            message: message.into(),
        });
    }

    /// Move `Unexecuted -> Executing`. Returns false if the unit already started.
    pub fn begin_execution(&mut self) -> bool {
        if self.state != UnitState::Unexecuted {
            return false;
        }
        self.state = UnitState::Executing;
        true
    }

    pub fn finish_execution(&mut self) {
        self.state = UnitState::Executed;
    }

    /// Set the printed guard. Returns false if the unit was already printed.
    pub fn mark_printed(&mut self) -> bool {
        !std::mem::replace(&mut self.has_printed, true)
    }

    pub(crate) fn adopt(&mut self, parent: UnitId, depth: usize, source_file: Option<String>) {
        self.parent = Some(parent);
        self.section_depth = depth;
        if source_file.is_some() {
            self.source_file = source_file;
        }
    }

    pub(crate) fn push_child(&mut self, key: &str, child: UnitId) {
        self.children.push(child);
        self.child_key_index.insert(key.to_string(), child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_unit_starts_detached_and_unexecuted() {
        let unit = ExecutionUnit::new(UnitId::new(0), "math", false);
        assert_eq!(unit.friendly_name(), "math");
        assert_eq!(unit.parent(), None);
        assert_eq!(unit.section_depth(), 0);
        assert!(unit.is_leaf_level());
        assert!(!unit.has_executed());
        assert_eq!(unit.forced_print_width(), None);
    }

    #[test]
    fn execution_state_only_moves_forward() {
        let mut unit = ExecutionUnit::new(UnitId::new(0), "u", false);
        assert!(unit.begin_execution());
        assert!(!unit.begin_execution());
        unit.finish_execution();
        assert!(!unit.begin_execution());
        assert_eq!(unit.state(), UnitState::Executed);
    }

    #[test]
    fn printed_guard_is_set_once() {
        let mut unit = ExecutionUnit::new(UnitId::new(0), "u", false);
        assert!(unit.mark_printed());
        assert!(!unit.mark_printed());
        assert!(unit.has_printed());
    }

    #[test]
    fn failures_keep_recording_order() {
        let mut unit = ExecutionUnit::new(UnitId::new(0), "u", false);
        unit.record_failure("first");
        unit.record_failure(String::from("second"));
        let messages: Vec<&str> = unit.failures().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn options_builder_sets_overrides() {
        let options = UnitOptions::new().expect_fail().print_width(40).debug(true);
        let mut unit = ExecutionUnit::new(UnitId::new(3), "u", false);
        unit.apply_options(options);
        assert!(unit.expect_fail());
        assert_eq!(unit.forced_print_width(), Some(40));
        assert_eq!(unit.forced_debug_mode(), Some(true));
    }
}
