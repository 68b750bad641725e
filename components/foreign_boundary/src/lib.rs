//! Foreign-boundary memory and call subsystem
//!
//! This crate is the layer between interpreted bitcode and the host
//! environment. It provides:
//! - Address kind resolution over native pointers, auto-deref handles,
//!   foreign objects, and global references
//! - Typed scalar and vector load sites with cached per-lane foreign
//!   read pools
//! - Callable descriptors with interpretable and intrinsic entry points
//! - Fast/slow argument packing and inline-cached call dispatch with
//!   scoped stack frames
//!
//! # Example
//!
//! ```
//! use foreign_boundary::{ForeignCallSite, FunctionDescriptor, FunctionSignature,
//!     InterpretedFunction, RuntimeContext};
//! use runtime_types::{ElementType, HostValue, RuntimeValue};
//!
//! let ctx = RuntimeContext::new();
//! let descriptor = FunctionDescriptor::interpreted(
//!     "double",
//!     FunctionSignature::new(Some(ElementType::I64), vec![ElementType::I64]),
//!     InterpretedFunction::new(|args| match args[1].value() {
//!         Some(RuntimeValue::I64(n)) => Ok(RuntimeValue::I64(n * 2)),
//!         other => panic!("unexpected argument {:?}", other),
//!     }),
//! );
//!
//! let mut site = ForeignCallSite::new();
//! let result = site.execute(&ctx, &descriptor, &[HostValue::Int(21)]).unwrap();
//! assert_eq!(result, HostValue::Int(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call;
pub mod callable;
pub mod context;
pub mod load;
pub mod profile;
pub mod resolve;

// Re-export main types at crate root
pub use call::{ForeignCallSite, PackArguments, PackedArg, SlowPackArguments};
pub use callable::{
    CallTarget, FunctionDescriptor, FunctionKind, FunctionSignature, InterpretedFunction,
    NativeIntrinsic,
};
pub use context::{HandleRegistry, RuntimeContext};
pub use load::LoadSite;
pub use profile::FloatValueProfile;
pub use resolve::{resolve_address, ResolvedAddress};
