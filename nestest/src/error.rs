//! Typed errors raised by the execution engine.
//!
//! Configuration errors are fatal to the declaring process: the suite stops at
//! the next unit boundary and the entry point exits with
//! [`crate::exit_codes::INVALID`]. Assertion failures are not errors; they are
//! recorded on the unit (see [`crate::core::unit::Failure`]).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("configuration error: {kind} name must not be empty")]
    EmptyName { kind: &'static str },

    #[error("configuration error: test `{name}` declared while `{enclosing}` is running")]
    NestedTest { name: String, enclosing: String },

    #[error("configuration error: test `{0}` declared twice")]
    DuplicateTest(String),

    #[error("configuration error: no test named `{0}`")]
    UnknownTest(String),

    #[error("corrupted unit tree: `{parent}` already binds `{key}` to a different unit")]
    CorruptedTree { parent: String, key: String },
}

impl EngineError {
    /// True for errors caused by how the suite was declared or invoked.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, EngineError::CorruptedTree { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_test_message_names_enclosing_unit() {
        let err = EngineError::NestedTest {
            name: "inner".to_string(),
            enclosing: "outer".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "configuration error: test `inner` declared while `outer` is running"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn corrupted_tree_is_not_a_configuration_error() {
        let err = EngineError::CorruptedTree {
            parent: "p".to_string(),
            key: "k".to_string(),
        };
        assert!(!err.is_configuration());
    }
}
