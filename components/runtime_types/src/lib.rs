//! Core value and address types for the bitcode runtime.
//!
//! This crate provides the shared vocabulary of the foreign-boundary
//! subsystem: element types, address representations, host and runtime
//! values, fixed-width vectors, and the runtime error taxonomy.
//!
//! # Overview
//!
//! - [`ElementType`] - Typed-read element kinds with fixed byte widths
//! - [`Address`] - Tagged union over the four address shapes
//! - [`ForeignObject`] - Host-managed objects read through typed access
//! - [`RuntimeValue`] / [`HostValue`] - The two value domains meeting at
//!   the boundary
//! - [`Vector`] / [`ScalarElement`] - Fixed-lane vectors and the scalar
//!   binding that keeps load logic generic
//! - [`RuntimeError`] - Recoverable boundary errors

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod element;
mod error;
mod value;
mod vector;

pub use address::{
    Address, ForeignObject, ForeignPointer, ForeignRef, GlobalId, NativeAddress,
    DEREF_HANDLE_SPACE_START,
};
pub use element::ElementType;
pub use error::RuntimeError;
pub use value::{HostValue, RuntimeValue};
pub use vector::{ScalarElement, Vector};
