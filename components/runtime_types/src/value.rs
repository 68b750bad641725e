//! Runtime and host value representations.
//!
//! Two value domains meet at the foreign boundary. [`HostValue`] is
//! what the host environment supplies and receives: loosely typed,
//! string- and object-carrying. [`RuntimeValue`] is the interpreter's
//! internal representation: exact-width scalars, fixed-lane vectors,
//! and managed pointers. Converters in the interop layer translate
//! between the two.

use std::fmt;
use std::rc::Rc;

use crate::{ForeignPointer, ForeignRef, NativeAddress, Vector};

/// A value as the host environment sees it.
#[derive(Clone)]
pub enum HostValue {
    /// Host boolean
    Bool(bool),
    /// Host integer (widest form)
    Int(i64),
    /// Host floating-point number (widest form)
    Float(f64),
    /// Host string
    Str(String),
    /// Host-managed object reference
    Object(ForeignRef),
}

impl HostValue {
    /// Short description of this value's runtime type and content,
    /// used in type-mismatch error messages.
    pub fn describe(&self) -> String {
        match self {
            HostValue::Bool(b) => format!("bool {}", b),
            HostValue::Int(n) => format!("int {}", n),
            HostValue::Float(n) => format!("float {}", n),
            HostValue::Str(s) => format!("string {:?}", s),
            HostValue::Object(_) => "object".to_string(),
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            HostValue::Int(n) => f.debug_tuple("Int").field(n).finish(),
            HostValue::Float(n) => f.debug_tuple("Float").field(n).finish(),
            HostValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            HostValue::Object(_) => write!(f, "Object(...)"),
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Int(a), HostValue::Int(b)) => a == b,
            // Bit-pattern comparison keeps NaN payloads and -0.0 distinct.
            (HostValue::Float(a), HostValue::Float(b)) => a.to_bits() == b.to_bits(),
            (HostValue::Str(a), HostValue::Str(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// The interpreter's internal value representation.
///
/// Integer reads are exact-width: each width is stored as its own
/// variant, never widened on the way in. Floating-point values compare
/// by bit pattern so that reads preserve the host's exact bits.
#[derive(Clone)]
pub enum RuntimeValue {
    /// Boolean scalar
    Bool(bool),
    /// 8-bit integer scalar
    I8(i8),
    /// 16-bit integer scalar
    I16(i16),
    /// 32-bit integer scalar
    I32(i32),
    /// 64-bit integer scalar
    I64(i64),
    /// 32-bit float scalar
    F32(f32),
    /// 64-bit float scalar
    F64(f64),
    /// Native pointer scalar
    Pointer(NativeAddress),
    /// Boolean vector
    BoolVector(Vector<bool>),
    /// 8-bit integer vector
    I8Vector(Vector<i8>),
    /// 16-bit integer vector
    I16Vector(Vector<i16>),
    /// 32-bit integer vector
    I32Vector(Vector<i32>),
    /// 64-bit integer vector
    I64Vector(Vector<i64>),
    /// 32-bit float vector
    F32Vector(Vector<f32>),
    /// 64-bit float vector
    F64Vector(Vector<f64>),
    /// Pointer vector
    PointerVector(Vector<NativeAddress>),
    /// Managed pointer into a host-owned object
    Managed(ForeignPointer),
}

impl fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            RuntimeValue::I8(v) => f.debug_tuple("I8").field(v).finish(),
            RuntimeValue::I16(v) => f.debug_tuple("I16").field(v).finish(),
            RuntimeValue::I32(v) => f.debug_tuple("I32").field(v).finish(),
            RuntimeValue::I64(v) => f.debug_tuple("I64").field(v).finish(),
            RuntimeValue::F32(v) => f.debug_tuple("F32").field(v).finish(),
            RuntimeValue::F64(v) => f.debug_tuple("F64").field(v).finish(),
            RuntimeValue::Pointer(v) => f.debug_tuple("Pointer").field(v).finish(),
            RuntimeValue::BoolVector(v) => f.debug_tuple("BoolVector").field(v).finish(),
            RuntimeValue::I8Vector(v) => f.debug_tuple("I8Vector").field(v).finish(),
            RuntimeValue::I16Vector(v) => f.debug_tuple("I16Vector").field(v).finish(),
            RuntimeValue::I32Vector(v) => f.debug_tuple("I32Vector").field(v).finish(),
            RuntimeValue::I64Vector(v) => f.debug_tuple("I64Vector").field(v).finish(),
            RuntimeValue::F32Vector(v) => f.debug_tuple("F32Vector").field(v).finish(),
            RuntimeValue::F64Vector(v) => f.debug_tuple("F64Vector").field(v).finish(),
            RuntimeValue::PointerVector(v) => f.debug_tuple("PointerVector").field(v).finish(),
            RuntimeValue::Managed(p) => write!(f, "Managed(offset={})", p.offset()),
        }
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuntimeValue::Bool(a), RuntimeValue::Bool(b)) => a == b,
            (RuntimeValue::I8(a), RuntimeValue::I8(b)) => a == b,
            (RuntimeValue::I16(a), RuntimeValue::I16(b)) => a == b,
            (RuntimeValue::I32(a), RuntimeValue::I32(b)) => a == b,
            (RuntimeValue::I64(a), RuntimeValue::I64(b)) => a == b,
            (RuntimeValue::F32(a), RuntimeValue::F32(b)) => a.to_bits() == b.to_bits(),
            (RuntimeValue::F64(a), RuntimeValue::F64(b)) => a.to_bits() == b.to_bits(),
            (RuntimeValue::Pointer(a), RuntimeValue::Pointer(b)) => a == b,
            (RuntimeValue::BoolVector(a), RuntimeValue::BoolVector(b)) => a == b,
            (RuntimeValue::I8Vector(a), RuntimeValue::I8Vector(b)) => a == b,
            (RuntimeValue::I16Vector(a), RuntimeValue::I16Vector(b)) => a == b,
            (RuntimeValue::I32Vector(a), RuntimeValue::I32Vector(b)) => a == b,
            (RuntimeValue::I64Vector(a), RuntimeValue::I64Vector(b)) => a == b,
            (RuntimeValue::F32Vector(a), RuntimeValue::F32Vector(b)) => {
                float_vector_eq(a.as_slice(), b.as_slice(), |v| v.to_bits() as u64)
            }
            (RuntimeValue::F64Vector(a), RuntimeValue::F64Vector(b)) => {
                float_vector_eq(a.as_slice(), b.as_slice(), |v| v.to_bits())
            }
            (RuntimeValue::PointerVector(a), RuntimeValue::PointerVector(b)) => a == b,
            (RuntimeValue::Managed(a), RuntimeValue::Managed(b)) => a.same_location(b),
            _ => false,
        }
    }
}

fn float_vector_eq<T: Copy>(a: &[T], b: &[T], bits: impl Fn(T) -> u64) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| bits(*x) == bits(*y))
}
