//! Address kind resolution.
//!
//! Classifies an opaque address into its concrete backing without
//! reading memory: either a plain native address or a managed foreign
//! pointer. All four incoming shapes funnel through here, so decoders
//! only ever see the native/managed split.

use native_memory::GlobalBacking;
use runtime_types::{Address, ForeignPointer, NativeAddress, RuntimeError};

use crate::context::RuntimeContext;

/// The concrete backing an address resolves to.
#[derive(Debug, Clone)]
pub enum ResolvedAddress {
    /// Directly addressable memory
    Native(NativeAddress),
    /// A host-managed object, read through the foreign bridge
    Managed(ForeignPointer),
}

/// Classify `address` into its concrete backing.
///
/// Auto-deref handles resolve their receiver through the context's
/// handle registry (once per read). Foreign objects that report a
/// native backing unwrap to plain native addresses. Global references
/// resolve through the global store, whose entries are cached after
/// first use.
pub fn resolve_address(
    ctx: &RuntimeContext,
    address: &Address,
) -> Result<ResolvedAddress, RuntimeError> {
    match address {
        Address::Native(addr) if addr.is_deref_handle() => {
            Ok(ResolvedAddress::Managed(ctx.handles().resolve(*addr)?))
        }
        Address::Native(addr) => Ok(ResolvedAddress::Native(*addr)),
        Address::Foreign(pointer) => Ok(unwrap_foreign(pointer)),
        Address::Global(id) => match ctx.globals().resolve(*id)? {
            GlobalBacking::Native(addr) => Ok(ResolvedAddress::Native(addr)),
            GlobalBacking::Managed(pointer) => Ok(unwrap_foreign(&pointer)),
        },
    }
}

fn unwrap_foreign(pointer: &ForeignPointer) -> ResolvedAddress {
    match pointer.as_native() {
        Some(addr) => ResolvedAddress::Native(addr),
        None => ResolvedAddress::Managed(pointer.clone()),
    }
}
