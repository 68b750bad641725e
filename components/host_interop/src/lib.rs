//! Host interop layer for the foreign boundary.
//!
//! This crate provides the pieces that touch host values directly:
//! - [`ForeignReadOp`] - one typed element read against a host object
//! - [`Converter`] / [`SlowPathConverter`] - host-to-runtime argument
//!   conversion, fast and general forms
//! - [`prepare_for_escape`] - runtime-to-host result conversion
//! - [`BoxedHostValue`] - host primitives travelling as managed pointers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boxed;
pub mod convert;
pub mod escape;
pub mod read_op;

// Re-export main types
pub use boxed::BoxedHostValue;
pub use convert::{convert_any, convert_typed, Converter, SlowPathConverter};
pub use escape::{prepare_for_escape, EscapedVector};
pub use read_op::ForeignReadOp;
