//! Value-escape conversion: runtime values leaving for the host.
//!
//! Every value returned across the boundary passes through
//! [`prepare_for_escape`]. Scalars widen to the host's natural forms.
//! Vectors and offset managed pointers cannot be flattened to a host
//! primitive, so they escape as read-only foreign objects that answer
//! typed reads and stay first-class on the host side.

use std::rc::Rc;

use runtime_types::{
    ElementType, ForeignObject, ForeignPointer, HostValue, RuntimeError, RuntimeValue,
};

/// Convert a raw call or load result into a host-visible value.
pub fn prepare_for_escape(value: RuntimeValue) -> HostValue {
    match value {
        RuntimeValue::Bool(b) => HostValue::Bool(b),
        RuntimeValue::I8(v) => HostValue::Int(v as i64),
        RuntimeValue::I16(v) => HostValue::Int(v as i64),
        RuntimeValue::I32(v) => HostValue::Int(v as i64),
        RuntimeValue::I64(v) => HostValue::Int(v),
        RuntimeValue::F32(v) => HostValue::Float(v as f64),
        RuntimeValue::F64(v) => HostValue::Float(v),
        RuntimeValue::Pointer(addr) => HostValue::Int(addr.raw() as i64),
        RuntimeValue::Managed(pointer) => {
            if pointer.offset() == 0 {
                HostValue::Object(pointer.object().clone())
            } else {
                HostValue::Object(Rc::new(PointerView { pointer }))
            }
        }
        vector => HostValue::Object(Rc::new(EscapedVector::new(vector))),
    }
}

/// A managed pointer escaping with a non-zero offset.
///
/// Reads delegate to the underlying object with the offset applied.
#[derive(Debug)]
struct PointerView {
    pointer: ForeignPointer,
}

impl ForeignObject for PointerView {
    fn read(&self, byte_offset: u64, ty: ElementType) -> Result<HostValue, RuntimeError> {
        self.pointer
            .object()
            .read(self.pointer.offset() + byte_offset, ty)
    }
}

/// A vector value escaped as a read-only foreign object.
///
/// Lane `i` answers a typed read at byte offset `i * width` of the
/// vector's element type.
#[derive(Debug)]
pub struct EscapedVector {
    value: RuntimeValue,
    element_type: ElementType,
}

impl EscapedVector {
    fn new(value: RuntimeValue) -> Self {
        let element_type = match &value {
            RuntimeValue::BoolVector(_) => ElementType::Bool,
            RuntimeValue::I8Vector(_) => ElementType::I8,
            RuntimeValue::I16Vector(_) => ElementType::I16,
            RuntimeValue::I32Vector(_) => ElementType::I32,
            RuntimeValue::I64Vector(_) => ElementType::I64,
            RuntimeValue::F32Vector(_) => ElementType::F32,
            RuntimeValue::F64Vector(_) => ElementType::F64,
            RuntimeValue::PointerVector(_) => ElementType::Pointer,
            other => unreachable!("not a vector value: {:?}", other),
        };
        EscapedVector {
            value,
            element_type,
        }
    }

    /// Number of lanes in the escaped vector.
    pub fn lane_count(&self) -> usize {
        match &self.value {
            RuntimeValue::BoolVector(v) => v.len(),
            RuntimeValue::I8Vector(v) => v.len(),
            RuntimeValue::I16Vector(v) => v.len(),
            RuntimeValue::I32Vector(v) => v.len(),
            RuntimeValue::I64Vector(v) => v.len(),
            RuntimeValue::F32Vector(v) => v.len(),
            RuntimeValue::F64Vector(v) => v.len(),
            RuntimeValue::PointerVector(v) => v.len(),
            other => unreachable!("not a vector value: {:?}", other),
        }
    }

    fn lane(&self, index: usize) -> Option<HostValue> {
        match &self.value {
            RuntimeValue::BoolVector(v) => v.get(index).map(HostValue::Bool),
            RuntimeValue::I8Vector(v) => v.get(index).map(|x| HostValue::Int(x as i64)),
            RuntimeValue::I16Vector(v) => v.get(index).map(|x| HostValue::Int(x as i64)),
            RuntimeValue::I32Vector(v) => v.get(index).map(|x| HostValue::Int(x as i64)),
            RuntimeValue::I64Vector(v) => v.get(index).map(HostValue::Int),
            RuntimeValue::F32Vector(v) => v.get(index).map(|x| HostValue::Float(x as f64)),
            RuntimeValue::F64Vector(v) => v.get(index).map(HostValue::Float),
            RuntimeValue::PointerVector(v) => v.get(index).map(|x| HostValue::Int(x.raw() as i64)),
            other => unreachable!("not a vector value: {:?}", other),
        }
    }
}

impl ForeignObject for EscapedVector {
    fn read(&self, byte_offset: u64, ty: ElementType) -> Result<HostValue, RuntimeError> {
        if ty != self.element_type {
            return Err(RuntimeError::type_mismatch(
                ty,
                format!("{} vector", self.element_type),
            ));
        }
        let width = self.element_type.size_in_bytes();
        if byte_offset % width != 0 {
            return Err(RuntimeError::Internal(format!(
                "misaligned vector read at offset {}",
                byte_offset
            )));
        }
        self.lane((byte_offset / width) as usize).ok_or_else(|| {
            RuntimeError::Internal(format!("vector read past last lane at offset {}", byte_offset))
        })
    }
}
