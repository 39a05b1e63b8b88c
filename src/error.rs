//! Error types for tree navigation and mutation.
//!
//! Validator outcomes are not errors: a failing validator is recorded as
//! node state (see [`crate::validation::Failure`]). The variants here cover
//! structural misuse of the mutation surface and are always returned
//! synchronously with the tree left unmodified.

/// Error type for tree navigation and mutation operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A path segment did not resolve to a node.
    #[error("Path '{path}' not found in tree")]
    PathNotFound { path: String },

    /// A value supplied to `set_value` does not match the composite's shape.
    #[error("Shape mismatch at '{path}': expected {expected}, got {actual}")]
    ShapeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// An operation was invoked on the wrong kind of node.
    #[error("Node at '{path}' is a {actual}, expected a {expected}")]
    KindMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A collection index was out of bounds.
    #[error("Index {index} out of range at '{path}' (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },
}

impl TreeError {
    /// Creates a new path-not-found error.
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Creates a new shape mismatch error.
    pub fn shape_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new kind mismatch error.
    pub fn kind_mismatch(
        path: impl Into<String>,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        Self::KindMismatch {
            path: path.into(),
            expected,
            actual,
        }
    }

    /// Creates a new index-out-of-range error.
    pub fn index_out_of_range(path: impl Into<String>, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            path: path.into(),
            index,
            len,
        }
    }
}
