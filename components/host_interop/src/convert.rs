//! Host-to-runtime value conversion.
//!
//! Conversion appears in two flavors mirroring the two argument-packing
//! paths. [`Converter`] is the fast, stateless form: built once per
//! declared parameter type (or as the generic "any" form for spillover
//! arguments) and reused on every call. [`SlowPathConverter`] is the
//! general form; it may consult live native memory, which lets it
//! materialize host strings for pointer-typed parameters.
//!
//! Coercion policy: numeric host values convert across kinds when the
//! target can represent them (a checked narrow for integers); host
//! strings never silently coerce; a wrong runtime type is a recoverable
//! type-mismatch error.

use native_memory::NativeMemory;
use num_traits::ToPrimitive;
use runtime_types::{
    ElementType, ForeignPointer, HostValue, NativeAddress, RuntimeError, RuntimeValue,
};

use crate::boxed::BoxedHostValue;

/// A reusable host-to-runtime converter for one argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// Convert to a specific element type
    Typed(ElementType),
    /// Generic conversion for arguments beyond the declared parameters
    Any,
}

impl Converter {
    /// Converter for a declared parameter of type `ty`.
    pub fn for_type(ty: ElementType) -> Self {
        Converter::Typed(ty)
    }

    /// The generic "any" converter.
    pub fn any() -> Self {
        Converter::Any
    }

    /// Convert one host value.
    pub fn convert(&self, value: &HostValue) -> Result<RuntimeValue, RuntimeError> {
        match self {
            Converter::Typed(ty) => convert_typed(*ty, value),
            Converter::Any => Ok(convert_any(value)),
        }
    }
}

/// Convert a host value to the given element type.
///
/// This single routine serves both the fast argument converters and the
/// foreign read bridge, so load coercion and call coercion agree.
pub fn convert_typed(ty: ElementType, value: &HostValue) -> Result<RuntimeValue, RuntimeError> {
    match ty {
        ElementType::Bool => match value {
            HostValue::Bool(b) => Ok(RuntimeValue::Bool(*b)),
            HostValue::Int(n) => Ok(RuntimeValue::Bool(*n != 0)),
            other => Err(mismatch(ty, other)),
        },
        ElementType::I8 => convert_int(ty, value, |n| n.to_i8().map(RuntimeValue::I8)),
        ElementType::I16 => convert_int(ty, value, |n| n.to_i16().map(RuntimeValue::I16)),
        ElementType::I32 => convert_int(ty, value, |n| n.to_i32().map(RuntimeValue::I32)),
        ElementType::I64 => convert_int(ty, value, |n| Some(RuntimeValue::I64(n))),
        ElementType::F32 => match value {
            HostValue::Float(f) => Ok(RuntimeValue::F32(*f as f32)),
            HostValue::Int(n) => Ok(RuntimeValue::F32(*n as f32)),
            other => Err(mismatch(ty, other)),
        },
        ElementType::F64 => match value {
            HostValue::Float(f) => Ok(RuntimeValue::F64(*f)),
            HostValue::Int(n) => Ok(RuntimeValue::F64(*n as f64)),
            other => Err(mismatch(ty, other)),
        },
        ElementType::Pointer => match value {
            HostValue::Int(n) => Ok(RuntimeValue::Pointer(NativeAddress::new(*n as u64))),
            HostValue::Object(obj) => Ok(RuntimeValue::Managed(ForeignPointer::new(obj.clone()))),
            other => Err(mismatch(ty, other)),
        },
    }
}

fn convert_int(
    ty: ElementType,
    value: &HostValue,
    narrow: impl Fn(i64) -> Option<RuntimeValue>,
) -> Result<RuntimeValue, RuntimeError> {
    match value {
        HostValue::Int(n) => narrow(*n).ok_or_else(|| mismatch(ty, value)),
        HostValue::Bool(b) => narrow(*b as i64).ok_or_else(|| mismatch(ty, value)),
        other => Err(mismatch(ty, other)),
    }
}

/// The generic conversion for spillover arguments.
///
/// Cannot fail: primitives map to their natural runtime scalars,
/// objects become managed pointers, and strings are boxed so they can
/// still cross the boundary as managed pointers.
pub fn convert_any(value: &HostValue) -> RuntimeValue {
    match value {
        HostValue::Bool(b) => RuntimeValue::Bool(*b),
        HostValue::Int(n) => RuntimeValue::I64(*n),
        HostValue::Float(f) => RuntimeValue::F64(*f),
        HostValue::Object(obj) => RuntimeValue::Managed(ForeignPointer::new(obj.clone())),
        HostValue::Str(_) => {
            RuntimeValue::Managed(ForeignPointer::new(BoxedHostValue::boxed(value.clone())))
        }
    }
}

fn mismatch(ty: ElementType, value: &HostValue) -> RuntimeError {
    RuntimeError::type_mismatch(ty, value.describe())
}

/// The general, type-directed conversion used by the slow packing path.
///
/// Unlike the fast converters it may consult live memory state: a host
/// string supplied for a pointer parameter is copied into native memory
/// as NUL-terminated bytes and passed by address.
#[derive(Debug, Default)]
pub struct SlowPathConverter;

impl SlowPathConverter {
    /// Create the slow converter.
    pub fn new() -> Self {
        SlowPathConverter
    }

    /// Convert `value` for a declared parameter of type `ty`.
    pub fn convert(
        &self,
        ty: ElementType,
        memory: &NativeMemory,
        value: &HostValue,
    ) -> Result<RuntimeValue, RuntimeError> {
        match (ty, value) {
            (ElementType::Pointer, HostValue::Str(s)) => {
                let addr = memory.allocate(s.len() + 1, 1);
                memory.put_bytes(addr, s.as_bytes());
                memory.put_i8(addr.offset_by(s.len() as u64), 0);
                Ok(RuntimeValue::Pointer(addr))
            }
            _ => convert_typed(ty, value),
        }
    }

    /// The generic conversion for spillover arguments.
    pub fn convert_any(&self, value: &HostValue) -> RuntimeValue {
        convert_any(value)
    }
}
