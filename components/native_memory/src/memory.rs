//! Typed access to directly addressable memory.
//!
//! [`NativeMemory`] owns an arena of native memory and exposes
//! exact-width scalar reads and writes plus bulk vector reads at
//! arbitrary addresses inside it. Reads never sign-extend: each width
//! is read and stored as its own type. Floats are read by bit pattern.

use runtime_types::{NativeAddress, ScalarElement, Vector};

use crate::arena::Arena;

/// Default capacity of a context's native memory, in bytes.
pub const DEFAULT_MEMORY_CAPACITY: usize = 16 * 1024 * 1024;

/// Directly addressable memory for one execution context.
///
/// Addresses are absolute; allocations stay valid for the lifetime of
/// this object. Out-of-bounds access is a caller bug and panics.
#[derive(Debug)]
pub struct NativeMemory {
    arena: Arena,
}

impl NativeMemory {
    /// Create memory with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CAPACITY)
    }

    /// Create memory with an explicit capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        NativeMemory {
            arena: Arena::new(capacity),
        }
    }

    /// Allocate `size` bytes with the given alignment.
    ///
    /// # Panics
    ///
    /// Panics if the arena is exhausted.
    pub fn allocate(&self, size: usize, align: usize) -> NativeAddress {
        let ptr = self.arena.allocate(size, align);
        if ptr.is_null() {
            panic!("Native memory exhausted allocating {} bytes", size);
        }
        NativeAddress::new(ptr as u64)
    }

    fn check(&self, addr: NativeAddress, len: u64) {
        if !self.arena.contains(addr.raw(), len) {
            panic!("Address {} outside native memory", addr);
        }
    }

    /// Read one `T` at `addr`.
    fn read_raw<T: Copy>(&self, addr: NativeAddress) -> T {
        self.check(addr, std::mem::size_of::<T>() as u64);
        // SAFETY: check() verified the range lies inside the arena;
        // read_unaligned imposes no alignment requirement
        unsafe { std::ptr::read_unaligned(addr.raw() as *const T) }
    }

    /// Write one `T` at `addr`.
    fn write_raw<T: Copy>(&self, addr: NativeAddress, value: T) {
        self.check(addr, std::mem::size_of::<T>() as u64);
        // SAFETY: check() verified the range; the arena is only ever
        // accessed through raw pointers, so no reference aliases it
        unsafe { std::ptr::write_unaligned(addr.raw() as *mut T, value) }
    }

    /// Read a boolean stored as one byte (zero = false).
    pub fn get_bool(&self, addr: NativeAddress) -> bool {
        self.read_raw::<u8>(addr) != 0
    }

    /// Read an 8-bit integer.
    pub fn get_i8(&self, addr: NativeAddress) -> i8 {
        self.read_raw(addr)
    }

    /// Read a 16-bit integer.
    pub fn get_i16(&self, addr: NativeAddress) -> i16 {
        self.read_raw(addr)
    }

    /// Read a 32-bit integer.
    pub fn get_i32(&self, addr: NativeAddress) -> i32 {
        self.read_raw(addr)
    }

    /// Read a 64-bit integer.
    pub fn get_i64(&self, addr: NativeAddress) -> i64 {
        self.read_raw(addr)
    }

    /// Read a 32-bit float, preserving the stored bit pattern.
    pub fn get_f32(&self, addr: NativeAddress) -> f32 {
        f32::from_bits(self.read_raw::<u32>(addr))
    }

    /// Read a 64-bit float, preserving the stored bit pattern.
    pub fn get_f64(&self, addr: NativeAddress) -> f64 {
        f64::from_bits(self.read_raw::<u64>(addr))
    }

    /// Read a pointer-sized address value.
    pub fn get_pointer(&self, addr: NativeAddress) -> NativeAddress {
        NativeAddress::new(self.read_raw::<u64>(addr))
    }

    /// Write a boolean as one byte.
    pub fn put_bool(&self, addr: NativeAddress, value: bool) {
        self.write_raw::<u8>(addr, value as u8);
    }

    /// Write an 8-bit integer.
    pub fn put_i8(&self, addr: NativeAddress, value: i8) {
        self.write_raw(addr, value);
    }

    /// Write a 16-bit integer.
    pub fn put_i16(&self, addr: NativeAddress, value: i16) {
        self.write_raw(addr, value);
    }

    /// Write a 32-bit integer.
    pub fn put_i32(&self, addr: NativeAddress, value: i32) {
        self.write_raw(addr, value);
    }

    /// Write a 64-bit integer.
    pub fn put_i64(&self, addr: NativeAddress, value: i64) {
        self.write_raw(addr, value);
    }

    /// Write a 32-bit float by bit pattern.
    pub fn put_f32(&self, addr: NativeAddress, value: f32) {
        self.write_raw::<u32>(addr, value.to_bits());
    }

    /// Write a 64-bit float by bit pattern.
    pub fn put_f64(&self, addr: NativeAddress, value: f64) {
        self.write_raw::<u64>(addr, value.to_bits());
    }

    /// Write a pointer-sized address value.
    pub fn put_pointer(&self, addr: NativeAddress, value: NativeAddress) {
        self.write_raw::<u64>(addr, value.raw());
    }

    /// Write a byte slice starting at `addr`.
    pub fn put_bytes(&self, addr: NativeAddress, bytes: &[u8]) {
        self.check(addr, bytes.len() as u64);
        // SAFETY: check() verified the destination range; source and
        // destination cannot overlap because the source is a Rust slice
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), addr.raw() as *mut u8, bytes.len());
        }
    }

    /// Read one scalar of type `T` at `addr`.
    pub fn get_scalar<T: NativeScalar>(&self, addr: NativeAddress) -> T {
        T::read(self, addr)
    }

    /// Bulk-read `lanes` consecutive scalars of type `T` starting at
    /// `addr` as one vector.
    pub fn get_vector<T: NativeScalar>(&self, addr: NativeAddress, lanes: usize) -> Vector<T> {
        let width = T::ELEMENT_TYPE.size_in_bytes();
        let mut elements = Vec::with_capacity(lanes);
        for i in 0..lanes {
            elements.push(T::read(self, addr.offset_by(i as u64 * width)));
        }
        Vector::create(elements)
    }
}

impl Default for NativeMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// A scalar element that native memory knows how to read and write.
pub trait NativeScalar: ScalarElement {
    /// Read one element at `addr`.
    fn read(memory: &NativeMemory, addr: NativeAddress) -> Self;
    /// Write one element at `addr`.
    fn write(memory: &NativeMemory, addr: NativeAddress, value: Self);
}

macro_rules! impl_native_scalar {
    ($ty:ty, $get:ident, $put:ident) => {
        impl NativeScalar for $ty {
            fn read(memory: &NativeMemory, addr: NativeAddress) -> Self {
                memory.$get(addr)
            }

            fn write(memory: &NativeMemory, addr: NativeAddress, value: Self) {
                memory.$put(addr, value);
            }
        }
    };
}

impl_native_scalar!(bool, get_bool, put_bool);
impl_native_scalar!(i8, get_i8, put_i8);
impl_native_scalar!(i16, get_i16, put_i16);
impl_native_scalar!(i32, get_i32, put_i32);
impl_native_scalar!(i64, get_i64, put_i64);
impl_native_scalar!(f32, get_f32, put_f32);
impl_native_scalar!(f64, get_f64, put_f64);
impl_native_scalar!(NativeAddress, get_pointer, put_pointer);
