//! The foreign read bridge.
//!
//! A [`ForeignReadOp`] performs exactly one typed element read against
//! a host-managed object. The operation is bound to its element type at
//! construction and carries no other state, so one instance is safely
//! reusable across many invocations at different offsets. Vector load
//! sites keep a pool of these, one per lane, created once and reused.

use runtime_types::{ElementType, ForeignPointer, RuntimeError, RuntimeValue};

use crate::convert::convert_typed;

/// A reusable, type-bound foreign read operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignReadOp {
    element_type: ElementType,
}

impl ForeignReadOp {
    /// Create a read operation for `element_type`.
    pub fn new(element_type: ElementType) -> Self {
        ForeignReadOp { element_type }
    }

    /// The element type this operation reads.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Read one element at the pointer's current byte offset.
    ///
    /// Issues a single host read; the returned host value must match
    /// this operation's element type or the read fails with a
    /// type-mismatch error. Host-side read side effects are not
    /// suppressed or memoized.
    pub fn execute(&self, pointer: &ForeignPointer) -> Result<RuntimeValue, RuntimeError> {
        let host = pointer.object().read(pointer.offset(), self.element_type)?;
        convert_typed(self.element_type, &host)
    }
}
