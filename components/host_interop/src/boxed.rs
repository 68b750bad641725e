//! Boxed host primitives crossing the boundary as managed pointers.
//!
//! When a host primitive has to travel where a pointer is expected, it
//! is wrapped in a [`BoxedHostValue`]. Scalar loads unbox integer boxes
//! back into native addresses; string boxes expose their UTF-8 bytes to
//! byte-sized reads, NUL-terminated.

use std::rc::Rc;

use runtime_types::{ElementType, ForeignObject, ForeignRef, HostValue, RuntimeError};

/// A host primitive wrapped as a foreign object.
#[derive(Debug)]
pub struct BoxedHostValue {
    value: HostValue,
}

impl BoxedHostValue {
    /// Box `value` as a foreign object reference.
    pub fn boxed(value: HostValue) -> ForeignRef {
        Rc::new(BoxedHostValue { value })
    }

    /// The boxed host value.
    pub fn value(&self) -> &HostValue {
        &self.value
    }
}

impl ForeignObject for BoxedHostValue {
    fn read(&self, byte_offset: u64, ty: ElementType) -> Result<HostValue, RuntimeError> {
        match &self.value {
            HostValue::Str(s) if ty == ElementType::I8 => {
                let bytes = s.as_bytes();
                let index = byte_offset as usize;
                if index < bytes.len() {
                    Ok(HostValue::Int(bytes[index] as i64))
                } else if index == bytes.len() {
                    Ok(HostValue::Int(0))
                } else {
                    Err(RuntimeError::Internal(format!(
                        "read past end of boxed string at offset {}",
                        byte_offset
                    )))
                }
            }
            other => Err(RuntimeError::type_mismatch(ty, other.describe())),
        }
    }

    fn unboxed(&self) -> Option<&HostValue> {
        Some(&self.value)
    }
}
