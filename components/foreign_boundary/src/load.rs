//! Load sites: typed scalar and vector reads over any address kind.
//!
//! Each load instruction owns one [`LoadSite`], created with its static
//! shape: the element type and, for vectors, the lane count. The site
//! caches the per-lane foreign-read pool across executions, so repeated
//! loads from managed objects allocate nothing.
//!
//! Vector loads have two families. Addresses that resolve native take a
//! single bulk memory read. Managed objects are read lane by lane, in
//! strictly increasing index order, stepping a cursor one element width
//! at a time; any lane failure aborts the whole read.

use std::cell::OnceCell;

use host_interop::ForeignReadOp;
use native_memory::{NativeMemory, NativeScalar};
use runtime_types::{
    Address, ElementType, ForeignPointer, HostValue, NativeAddress, RuntimeError, RuntimeValue,
    ScalarElement, Vector,
};

use crate::context::RuntimeContext;
use crate::profile::FloatValueProfile;
use crate::resolve::{resolve_address, ResolvedAddress};

/// One load instruction's read machinery.
///
/// The shape (element type, lane count) is fixed at construction and
/// must not vary across executions of the same site.
#[derive(Debug)]
pub struct LoadSite {
    element_type: ElementType,
    /// `None` for scalar sites
    lane_count: Option<usize>,
    /// Per-lane foreign reads, one per lane (one total for scalars);
    /// created on first managed read, reused ever after
    foreign_reads: OnceCell<Vec<ForeignReadOp>>,
    float_profile: FloatValueProfile,
}

impl LoadSite {
    /// Create a scalar load site.
    pub fn new_scalar(element_type: ElementType) -> Self {
        LoadSite {
            element_type,
            lane_count: None,
            foreign_reads: OnceCell::new(),
            float_profile: FloatValueProfile::new(),
        }
    }

    /// Create a vector load site with a fixed lane count.
    pub fn new_vector(element_type: ElementType, lane_count: usize) -> Self {
        LoadSite {
            element_type,
            lane_count: Some(lane_count),
            foreign_reads: OnceCell::new(),
            float_profile: FloatValueProfile::new(),
        }
    }

    /// The element type this site reads.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// The lane count, or `None` for a scalar site.
    pub fn lane_count(&self) -> Option<usize> {
        self.lane_count
    }

    /// Execute one load at `address`.
    pub fn execute(
        &self,
        ctx: &RuntimeContext,
        address: &Address,
    ) -> Result<RuntimeValue, RuntimeError> {
        match resolve_address(ctx, address)? {
            ResolvedAddress::Native(addr) => self.read_native(ctx.memory(), addr),
            ResolvedAddress::Managed(pointer) => self.read_managed(ctx.memory(), &pointer),
        }
    }

    fn read_native(
        &self,
        memory: &NativeMemory,
        addr: NativeAddress,
    ) -> Result<RuntimeValue, RuntimeError> {
        Ok(match self.lane_count {
            None => self.native_scalar(memory, addr),
            Some(_) => self.native_vector(memory, addr),
        })
    }

    fn read_managed(
        &self,
        memory: &NativeMemory,
        pointer: &ForeignPointer,
    ) -> Result<RuntimeValue, RuntimeError> {
        match self.lane_count {
            None => self.managed_scalar(memory, pointer),
            Some(_) => self.managed_vector(pointer),
        }
    }

    fn native_scalar(&self, memory: &NativeMemory, addr: NativeAddress) -> RuntimeValue {
        match self.element_type {
            ElementType::Bool => RuntimeValue::Bool(memory.get_bool(addr)),
            ElementType::I8 => RuntimeValue::I8(memory.get_i8(addr)),
            ElementType::I16 => RuntimeValue::I16(memory.get_i16(addr)),
            ElementType::I32 => RuntimeValue::I32(memory.get_i32(addr)),
            ElementType::I64 => RuntimeValue::I64(memory.get_i64(addr)),
            ElementType::F32 => {
                RuntimeValue::F32(self.float_profile.profile_f32(memory.get_f32(addr)))
            }
            ElementType::F64 => {
                RuntimeValue::F64(self.float_profile.profile_f64(memory.get_f64(addr)))
            }
            ElementType::Pointer => RuntimeValue::Pointer(memory.get_pointer(addr)),
        }
    }

    fn native_vector(&self, memory: &NativeMemory, addr: NativeAddress) -> RuntimeValue {
        match self.element_type {
            ElementType::Bool => self.bulk_read::<bool>(memory, addr),
            ElementType::I8 => self.bulk_read::<i8>(memory, addr),
            ElementType::I16 => self.bulk_read::<i16>(memory, addr),
            ElementType::I32 => self.bulk_read::<i32>(memory, addr),
            ElementType::I64 => self.bulk_read::<i64>(memory, addr),
            ElementType::F32 => self.bulk_read::<f32>(memory, addr),
            ElementType::F64 => self.bulk_read::<f64>(memory, addr),
            ElementType::Pointer => self.bulk_read::<NativeAddress>(memory, addr),
        }
    }

    fn bulk_read<T: NativeScalar>(&self, memory: &NativeMemory, addr: NativeAddress) -> RuntimeValue {
        let lanes = match self.lane_count {
            Some(lanes) => lanes,
            None => unreachable!("should not reach here: scalar site in bulk read"),
        };
        T::vector_into_value(memory.get_vector::<T>(addr, lanes))
    }

    fn managed_scalar(
        &self,
        memory: &NativeMemory,
        pointer: &ForeignPointer,
    ) -> Result<RuntimeValue, RuntimeError> {
        // A boxed host integer travelling as a pointer is an address.
        if let Some(boxed) = pointer.object().unboxed() {
            return match boxed {
                HostValue::Int(raw) => {
                    let addr = NativeAddress::new(*raw as u64).offset_by(pointer.offset());
                    Ok(self.native_scalar(memory, addr))
                }
                other => Err(RuntimeError::Internal(format!(
                    "cannot access boxed {} as an address",
                    other.describe()
                ))),
            };
        }
        self.scalar_foreign_read().execute(pointer)
    }

    fn managed_vector(&self, pointer: &ForeignPointer) -> Result<RuntimeValue, RuntimeError> {
        if self.element_type.is_pointer() {
            // A foreign object can itself represent an address, so lane
            // striding cannot tell object elements from address elements.
            return Err(RuntimeError::Unimplemented(
                "pointer-element vector loads over managed foreign objects".to_string(),
            ));
        }
        match self.element_type {
            ElementType::Bool => self.per_lane_read::<bool>(pointer),
            ElementType::I8 => self.per_lane_read::<i8>(pointer),
            ElementType::I16 => self.per_lane_read::<i16>(pointer),
            ElementType::I32 => self.per_lane_read::<i32>(pointer),
            ElementType::I64 => self.per_lane_read::<i64>(pointer),
            ElementType::F32 => self.per_lane_read::<f32>(pointer),
            ElementType::F64 => self.per_lane_read::<f64>(pointer),
            ElementType::Pointer => unreachable!("should not reach here: rejected above"),
        }
    }

    fn per_lane_read<T: ScalarElement>(
        &self,
        pointer: &ForeignPointer,
    ) -> Result<RuntimeValue, RuntimeError> {
        let width = self.element_type.size_in_bytes();
        let reads = self.foreign_reads();
        let mut lanes = Vec::with_capacity(reads.len());
        let mut cursor = pointer.clone();
        for read in reads {
            let value = read.execute(&cursor)?;
            let lane = match T::from_value(&value) {
                Some(lane) => lane,
                None => unreachable!("foreign read returned a non-{} value", T::ELEMENT_TYPE),
            };
            lanes.push(lane);
            cursor = cursor.incremented(width);
        }
        Ok(T::vector_into_value(Vector::create(lanes)))
    }

    /// The pooled read operations, one per lane.
    ///
    /// Built on first use and reused across executions of this site.
    fn foreign_reads(&self) -> &[ForeignReadOp] {
        self.foreign_reads.get_or_init(|| {
            let count = self.lane_count.unwrap_or(1);
            (0..count)
                .map(|_| ForeignReadOp::new(self.element_type))
                .collect()
        })
    }

    fn scalar_foreign_read(&self) -> &ForeignReadOp {
        if self.lane_count.is_some() {
            unreachable!("should not reach here: vector sites use the per-lane pool");
        }
        &self.foreign_reads()[0]
    }
}
