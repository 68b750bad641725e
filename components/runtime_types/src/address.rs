//! Address representation for the foreign boundary.
//!
//! The memory subsystem unifies several incompatible address shapes
//! behind one read contract: concrete native addresses, native-encoded
//! auto-deref handles, foreign objects owned by a host environment, and
//! global-variable references. This module provides the vocabulary
//! types; classification lives in the `boundary` crate.

use std::fmt;
use std::rc::Rc;

use crate::{ElementType, HostValue, RuntimeError};

/// Start of the reserved auto-deref handle encoding range.
///
/// Native addresses with the top bit set do not denote real memory;
/// they are handles that must be resolved to a foreign object before
/// any read.
pub const DEREF_HANDLE_SPACE_START: u64 = 1 << 63;

/// A concrete offset into directly addressable memory.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeAddress(u64);

impl NativeAddress {
    /// Wrap a raw address value.
    pub fn new(raw: u64) -> Self {
        NativeAddress(raw)
    }

    /// The raw address value.
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Whether this address lies in the auto-deref handle space.
    pub fn is_deref_handle(self) -> bool {
        self.0 >= DEREF_HANDLE_SPACE_START
    }

    /// The address `bytes` bytes past this one.
    pub fn offset_by(self, bytes: u64) -> Self {
        NativeAddress(self.0 + bytes)
    }
}

impl fmt::Display for NativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Identifier of a module-level global variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub u32);

/// A value owned by a host environment outside this subsystem's memory.
///
/// Foreign objects are accessed only through typed reads. An object may
/// report that it is actually backed by native memory, in which case
/// the resolver unwraps it and takes the native fast path.
pub trait ForeignObject: fmt::Debug {
    /// Read one element of `ty` at `byte_offset` into the object.
    ///
    /// The returned host value's runtime type must match `ty`; callers
    /// fail with a type-mismatch error when it does not. Reads are not
    /// memoized, so host-side read side effects are observable.
    fn read(&self, byte_offset: u64, ty: ElementType) -> Result<HostValue, RuntimeError>;

    /// Whether this object is backed by native memory.
    fn is_native(&self) -> bool {
        false
    }

    /// The native address backing this object, if [`is_native`] is true.
    ///
    /// [`is_native`]: ForeignObject::is_native
    fn as_native(&self) -> Option<NativeAddress> {
        None
    }

    /// If this object is a boxed host primitive, the boxed value.
    ///
    /// Scalar loads treat a boxed integer as a native address.
    fn unboxed(&self) -> Option<&HostValue> {
        None
    }
}

/// Shared reference to a foreign object.
///
/// Execution contexts are single-threaded, so `Rc` suffices.
pub type ForeignRef = Rc<dyn ForeignObject>;

/// A pointer into a foreign object: the object plus a byte offset.
///
/// This is the managed analog of a native address. Vector loads advance
/// the offset cursor lane by lane via [`incremented`].
///
/// [`incremented`]: ForeignPointer::incremented
#[derive(Debug, Clone)]
pub struct ForeignPointer {
    object: ForeignRef,
    offset: u64,
}

impl ForeignPointer {
    /// Point at byte offset 0 of `object`.
    pub fn new(object: ForeignRef) -> Self {
        ForeignPointer { object, offset: 0 }
    }

    /// The foreign object this pointer addresses.
    pub fn object(&self) -> &ForeignRef {
        &self.object
    }

    /// The current byte offset into the object.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// A pointer `bytes` bytes past this one, into the same object.
    pub fn incremented(&self, bytes: u64) -> Self {
        ForeignPointer {
            object: Rc::clone(&self.object),
            offset: self.offset + bytes,
        }
    }

    /// Whether the pointed-to object is backed by native memory.
    pub fn is_native(&self) -> bool {
        self.object.is_native()
    }

    /// Unwrap to the backing native address, offset applied.
    ///
    /// Returns `None` for genuinely managed objects.
    pub fn as_native(&self) -> Option<NativeAddress> {
        self.object.as_native().map(|a| a.offset_by(self.offset))
    }

    /// Whether two pointers address the same object at the same offset.
    pub fn same_location(&self, other: &ForeignPointer) -> bool {
        Rc::ptr_eq(&self.object, &other.object) && self.offset == other.offset
    }
}

/// An opaque address value as seen by a load or store instruction.
///
/// Exactly one variant is active. A `Native` address inside the
/// deref-handle space does not denote memory; it must be resolved to a
/// [`ForeignPointer`] through the context's handle registry before use.
#[derive(Debug, Clone)]
pub enum Address {
    /// Raw native pointer (or auto-deref handle, by encoding range)
    Native(NativeAddress),
    /// Foreign object pointer, native-backed or host-managed
    Foreign(ForeignPointer),
    /// Reference to a module-level global variable
    Global(GlobalId),
}
