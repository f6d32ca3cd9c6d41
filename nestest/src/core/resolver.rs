//! Declaration resolution: first sighting registers, later sightings look up.
//!
//! A section body runs once to discover its children and is replayed to
//! execute them, so the same declaration call-site is reached several times.
//! The child key index on the enclosing unit makes every replay resolve to the
//! unit registered by the first sighting.

use crate::core::tree::UnitTree;
use crate::core::unit::{UnitId, UnitOptions};
use crate::error::EngineError;

/// Result of resolving a section declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    /// First sighting: a new child was attached; its body has not run.
    Registered(UnitId),
    /// The enclosing unit already knows a child with this name.
    Known(UnitId),
}

impl Declaration {
    pub fn unit(self) -> UnitId {
        match self {
            Declaration::Registered(id) | Declaration::Known(id) => id,
        }
    }
}

/// Register a root test.
///
/// `active` is the unit whose body is currently running, if any; tests cannot
/// be declared from inside another test or section.
pub fn declare_root(
    tree: &mut UnitTree,
    active: Option<UnitId>,
    name: &str,
    options: UnitOptions,
    source_file: &str,
) -> Result<UnitId, EngineError> {
    validate_name(name, "test")?;
    if let Some(enclosing) = active {
        return Err(EngineError::NestedTest {
            name: name.to_string(),
            enclosing: tree.get(enclosing).friendly_name().to_string(),
        });
    }
    if tree.root_named(name).is_some() {
        return Err(EngineError::DuplicateTest(name.to_string()));
    }

    let id = tree.allocate(name, options);
    tree.get_mut(id).set_source_file(source_file);
    tree.push_root(id);
    Ok(id)
}

/// Resolve a section declared inside `parent`'s body.
pub fn declare_section(
    tree: &mut UnitTree,
    parent: UnitId,
    name: &str,
    options: UnitOptions,
) -> Result<Declaration, EngineError> {
    validate_name(name, "section")?;
    if let Some(existing) = tree.get(parent).child_key(name) {
        return Ok(Declaration::Known(existing));
    }

    let id = tree.allocate(name, options);
    tree.attach_child(parent, name, id)?;
    Ok(Declaration::Registered(id))
}

fn validate_name(name: &str, kind: &'static str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::EmptyName { kind });
    }
    Ok(())
}
