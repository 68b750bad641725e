//! Runtime error types for the foreign boundary.
//!
//! These are the recoverable errors raised at operation boundaries:
//! argument-count mismatches, host values of the wrong runtime type, and
//! paths that are deliberately left unimplemented. Linkage defects that
//! the caller may still want to observe (a handle or global that was
//! never registered) surface as [`RuntimeError::Internal`].
//!
//! Conditions that indicate a corrupted runtime state (a callable that
//! resolves to neither a body nor an intrinsic, a decode request with no
//! registered path) are not represented here; they abort via `panic!`.

use crate::ElementType;
use thiserror::Error;

/// A recoverable runtime error raised at the foreign boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Fewer arguments were supplied than the callable requires.
    #[error("arity error: expected at least {expected} arguments, got {actual}")]
    Arity {
        /// Minimum number of arguments the callable declares
        expected: usize,
        /// Number of arguments actually supplied
        actual: usize,
    },

    /// A host value's runtime type does not match the requested element type.
    #[error("type mismatch: expected {expected}, host supplied {actual}")]
    TypeMismatch {
        /// The element type the read or conversion asked for
        expected: ElementType,
        /// Description of the host value actually seen
        actual: String,
    },

    /// A path that is deliberately not implemented.
    #[error("not yet implemented: {0}")]
    Unimplemented(String),

    /// A linkage defect: something upstream failed to register state
    /// this operation depends on.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Build a type-mismatch error from the expected type and a
    /// description of the offending host value.
    pub fn type_mismatch(expected: ElementType, actual: impl Into<String>) -> Self {
        RuntimeError::TypeMismatch {
            expected,
            actual: actual.into(),
        }
    }
}
