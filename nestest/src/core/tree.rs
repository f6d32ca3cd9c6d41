//! Arena holding every unit declared in one suite process.
//!
//! Units refer to each other by [`UnitId`]; parents own their children through
//! the arena and children keep a non-owning back reference.

use crate::core::unit::{ExecutionUnit, UnitId, UnitOptions};
use crate::error::EngineError;

/// Width used when neither a unit, its ancestors, nor the configuration set one.
pub const DEFAULT_PRINT_WIDTH: usize = 80;

#[derive(Debug, Clone, Default)]
pub struct UnitTree {
    units: Vec<ExecutionUnit>,
    roots: Vec<UnitId>,
}

impl UnitTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Allocate a new detached unit.
    pub fn allocate(&mut self, name: &str, options: UnitOptions) -> UnitId {
        let id = UnitId::new(self.units.len());
        let mut unit = ExecutionUnit::new(id, name, options.expect_fail);
        unit.apply_options(options);
        self.units.push(unit);
        id
    }

    pub fn push_root(&mut self, id: UnitId) {
        self.roots.push(id);
    }

    /// Root tests in declaration order.
    pub fn roots(&self) -> &[UnitId] {
        &self.roots
    }

    pub fn root_named(&self, name: &str) -> Option<UnitId> {
        self.roots
            .iter()
            .copied()
            .find(|id| self.get(*id).friendly_name() == name)
    }

    pub fn get(&self, id: UnitId) -> &ExecutionUnit {
        &self.units[id.index()]
    }

    pub fn get_mut(&mut self, id: UnitId) -> &mut ExecutionUnit {
        &mut self.units[id.index()]
    }

    /// Attach `child` under `parent` with the given key.
    ///
    /// Re-attaching the same child under the same key is a no-op. Binding a key
    /// that already names a different child, or adopting a unit that already has
    /// another parent, is a corrupted-tree error.
    pub fn attach_child(
        &mut self,
        parent: UnitId,
        key: &str,
        child: UnitId,
    ) -> Result<(), EngineError> {
        let corrupted = || EngineError::CorruptedTree {
            parent: self.get(parent).friendly_name().to_string(),
            key: key.to_string(),
        };
        if let Some(bound) = self.get(parent).child_key(key) {
            return if bound == child {
                Ok(())
            } else {
                Err(corrupted())
            };
        }
        if self.get(child).parent().is_some_and(|p| p != parent) {
            return Err(corrupted());
        }

        let depth = self.get(parent).section_depth() + 1;
        let source_file = self.get(parent).source_file().map(str::to_string);
        self.get_mut(child).adopt(parent, depth, source_file);
        self.get_mut(parent).push_child(key, child);
        Ok(())
    }

    /// Ancestors of `id`, from its immediate parent up to the root.
    pub fn ancestor_chain(&self, id: UnitId) -> AncestorChain<'_> {
        AncestorChain {
            tree: self,
            next: self.get(id).parent(),
        }
    }

    /// Friendly names from the root down to `id`.
    pub fn path(&self, id: UnitId) -> Vec<String> {
        let mut path: Vec<String> = self
            .ancestor_chain(id)
            .map(|unit| unit.friendly_name().to_string())
            .collect();
        path.reverse();
        path.push(self.get(id).friendly_name().to_string());
        path
    }

    /// Resolve a name path (root first) to a unit.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<UnitId> {
        let (first, rest) = path.split_first()?;
        let mut current = self.root_named(first.as_ref())?;
        for name in rest {
            current = self.get(current).child_key(name.as_ref())?;
        }
        Some(current)
    }

    /// Own forced width, then the nearest ancestor's, then `default`.
    pub fn effective_print_width(&self, id: UnitId, default: usize) -> usize {
        std::iter::once(self.get(id))
            .chain(self.ancestor_chain(id))
            .find_map(ExecutionUnit::forced_print_width)
            .unwrap_or(default)
    }

    /// Own forced debug mode, then the nearest ancestor's, then `default`.
    pub fn effective_debug(&self, id: UnitId, default: bool) -> bool {
        std::iter::once(self.get(id))
            .chain(self.ancestor_chain(id))
            .find_map(ExecutionUnit::forced_debug_mode)
            .unwrap_or(default)
    }
}

/// Iterator over a unit's ancestors. Recomputed from the tree on every call to
/// [`UnitTree::ancestor_chain`].
pub struct AncestorChain<'t> {
    tree: &'t UnitTree,
    next: Option<UnitId>,
}

impl<'t> Iterator for AncestorChain<'t> {
    type Item = &'t ExecutionUnit;

    fn next(&mut self) -> Option<Self::Item> {
        let unit = self.tree.get(self.next?);
        self.next = unit.parent();
        Some(unit)
    }
}
