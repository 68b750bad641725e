//! Unit tests for the foreign-boundary subsystem

use std::cell::RefCell;
use std::rc::Rc;

use foreign_boundary::{
    ForeignCallSite, FunctionDescriptor, FunctionSignature, InterpretedFunction, LoadSite,
    NativeIntrinsic, RuntimeContext,
};
use runtime_types::{
    Address, ElementType, ForeignObject, ForeignPointer, HostValue, RuntimeError, RuntimeValue,
};

/// Managed object backed by a byte buffer, answering typed reads the
/// way a well-behaved host array would.
#[derive(Debug)]
struct ByteBackedObject {
    bytes: Vec<u8>,
    reads: RefCell<Vec<u64>>,
}

impl ByteBackedObject {
    fn new(bytes: Vec<u8>) -> Rc<Self> {
        Rc::new(ByteBackedObject {
            bytes,
            reads: RefCell::new(Vec::new()),
        })
    }

    fn le_bytes(&self, offset: u64, width: usize) -> [u8; 8] {
        let mut out = [0u8; 8];
        let start = offset as usize;
        out[..width].copy_from_slice(&self.bytes[start..start + width]);
        out
    }
}

impl ForeignObject for ByteBackedObject {
    fn read(&self, byte_offset: u64, ty: ElementType) -> Result<HostValue, RuntimeError> {
        self.reads.borrow_mut().push(byte_offset);
        let width = ty.size_in_bytes() as usize;
        let raw = u64::from_le_bytes(self.le_bytes(byte_offset, width));
        Ok(match ty {
            ElementType::Bool => HostValue::Bool(raw != 0),
            ElementType::I8 => HostValue::Int(raw as u8 as i8 as i64),
            ElementType::I16 => HostValue::Int(raw as u16 as i16 as i64),
            ElementType::I32 => HostValue::Int(raw as u32 as i32 as i64),
            ElementType::I64 => HostValue::Int(raw as i64),
            ElementType::F32 => HostValue::Float(f32::from_bits(raw as u32) as f64),
            ElementType::F64 => HostValue::Float(f64::from_bits(raw)),
            ElementType::Pointer => HostValue::Int(raw as i64),
        })
    }
}

// ============================================================================
// Load site tests
// ============================================================================

/// Property 1: a vector load over a native address equals the sequence
/// of independent scalar reads at increasing offsets.
#[test]
fn test_vector_load_matches_scalar_reads_native() {
    let ctx = RuntimeContext::with_memory_capacity(64 * 1024);
    let element_types = [
        ElementType::Bool,
        ElementType::I8,
        ElementType::I16,
        ElementType::I32,
        ElementType::I64,
        ElementType::F32,
        ElementType::F64,
        ElementType::Pointer,
    ];

    for ty in element_types {
        for lanes in [0usize, 1, 2, 4, 8] {
            let width = ty.size_in_bytes();
            let base = ctx.memory().allocate((width * 8) as usize, 8);
            for b in 0..width * 8 {
                // Arbitrary distinct bytes across the whole region.
                ctx.memory()
                    .put_i8(base.offset_by(b), (b as i8).wrapping_mul(7).wrapping_add(1));
            }

            let vector_site = LoadSite::new_vector(ty, lanes);
            let scalar_site = LoadSite::new_scalar(ty);

            let vector = vector_site.execute(&ctx, &Address::Native(base)).unwrap();
            let scalars: Vec<RuntimeValue> = (0..lanes)
                .map(|i| {
                    scalar_site
                        .execute(&ctx, &Address::Native(base.offset_by(i as u64 * width)))
                        .unwrap()
                })
                .collect();

            assert_vector_matches_scalars(ty, &vector, &scalars);
        }
    }
}

fn assert_vector_matches_scalars(ty: ElementType, vector: &RuntimeValue, scalars: &[RuntimeValue]) {
    let lanes: Vec<RuntimeValue> = match vector {
        RuntimeValue::BoolVector(v) => v.as_slice().iter().map(|x| RuntimeValue::Bool(*x)).collect(),
        RuntimeValue::I8Vector(v) => v.as_slice().iter().map(|x| RuntimeValue::I8(*x)).collect(),
        RuntimeValue::I16Vector(v) => v.as_slice().iter().map(|x| RuntimeValue::I16(*x)).collect(),
        RuntimeValue::I32Vector(v) => v.as_slice().iter().map(|x| RuntimeValue::I32(*x)).collect(),
        RuntimeValue::I64Vector(v) => v.as_slice().iter().map(|x| RuntimeValue::I64(*x)).collect(),
        RuntimeValue::F32Vector(v) => v.as_slice().iter().map(|x| RuntimeValue::F32(*x)).collect(),
        RuntimeValue::F64Vector(v) => v.as_slice().iter().map(|x| RuntimeValue::F64(*x)).collect(),
        RuntimeValue::PointerVector(v) => {
            v.as_slice().iter().map(|x| RuntimeValue::Pointer(*x)).collect()
        }
        other => panic!("vector load of {} produced {:?}", ty, other),
    };
    assert_eq!(lanes, scalars, "lane mismatch for {}", ty);
}

/// Property 2: per-lane managed reads happen in strictly increasing
/// index order and see offsets 0, width, 2*width, ...
#[test]
fn test_managed_vector_reads_in_index_order() {
    let ctx = RuntimeContext::with_memory_capacity(4096);
    let bytes: Vec<u8> = (0..32).collect();
    let object = ByteBackedObject::new(bytes);

    let site = LoadSite::new_vector(ElementType::I64, 4);
    site.execute(&ctx, &Address::Foreign(ForeignPointer::new(object.clone())))
        .unwrap();

    assert_eq!(*object.reads.borrow(), vec![0, 8, 16, 24]);
}

/// Property 6: the concrete {1,2,3,4} scenario, native and managed.
#[test]
fn test_four_lane_i32_vector_concrete() {
    let ctx = RuntimeContext::with_memory_capacity(4096);

    // Native: bytes for {1,2,3,4}.
    let addr = ctx.memory().allocate(16, 4);
    for i in 0..4 {
        ctx.memory().put_i32(addr.offset_by(i * 4), i as i32 + 1);
    }
    let site = LoadSite::new_vector(ElementType::I32, 4);
    let native = site.execute(&ctx, &Address::Native(addr)).unwrap();

    // Managed: read function returns offset/4 + 1 for offsets 0,4,8,12.
    #[derive(Debug)]
    struct Strided;
    impl ForeignObject for Strided {
        fn read(&self, byte_offset: u64, _ty: ElementType) -> Result<HostValue, RuntimeError> {
            Ok(HostValue::Int((byte_offset / 4 + 1) as i64))
        }
    }
    let managed_site = LoadSite::new_vector(ElementType::I32, 4);
    let managed = managed_site
        .execute(&ctx, &Address::Foreign(ForeignPointer::new(Rc::new(Strided))))
        .unwrap();

    let expected = RuntimeValue::I32Vector(runtime_types::Vector::create(vec![1, 2, 3, 4]));
    assert_eq!(native, expected);
    assert_eq!(managed, expected);
}

/// Property 5: pointer-element vector loads over managed objects fail
/// with the unimplemented-path error, never return a value.
#[test]
fn test_pointer_vector_over_managed_always_fails() {
    let ctx = RuntimeContext::with_memory_capacity(4096);
    let object = ByteBackedObject::new(vec![0; 64]);

    for lanes in [0usize, 1, 4] {
        let site = LoadSite::new_vector(ElementType::Pointer, lanes);
        let err = site
            .execute(&ctx, &Address::Foreign(ForeignPointer::new(object.clone())))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Unimplemented(_)));
    }
    // No lane read was ever attempted.
    assert!(object.reads.borrow().is_empty());
}

#[test]
fn test_lane_failure_aborts_whole_vector_read() {
    #[derive(Debug)]
    struct FailsAtLaneTwo;
    impl ForeignObject for FailsAtLaneTwo {
        fn read(&self, byte_offset: u64, ty: ElementType) -> Result<HostValue, RuntimeError> {
            if byte_offset >= 8 {
                Err(RuntimeError::type_mismatch(ty, "string \"boom\""))
            } else {
                Ok(HostValue::Int(1))
            }
        }
    }

    let ctx = RuntimeContext::with_memory_capacity(4096);
    let site = LoadSite::new_vector(ElementType::I32, 4);
    let err = site
        .execute(
            &ctx,
            &Address::Foreign(ForeignPointer::new(Rc::new(FailsAtLaneTwo))),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
}

#[test]
fn test_deref_handle_takes_managed_path() {
    let ctx = RuntimeContext::with_memory_capacity(4096);
    let object = ByteBackedObject::new((1u8..=16).collect());
    let handle = ctx.handles().create(object.clone());

    let site = LoadSite::new_vector(ElementType::I8, 4);
    let value = site.execute(&ctx, &Address::Native(handle)).unwrap();
    assert_eq!(
        value,
        RuntimeValue::I8Vector(runtime_types::Vector::create(vec![1, 2, 3, 4]))
    );
    assert_eq!(*object.reads.borrow(), vec![0, 1, 2, 3]);
}

#[test]
fn test_global_load_uses_native_fast_path() {
    let ctx = RuntimeContext::with_memory_capacity(4096);
    let addr = ctx.memory().allocate(8, 8);
    ctx.memory().put_i64(addr, 99);
    ctx.globals().define_native(runtime_types::GlobalId(7), addr);

    let site = LoadSite::new_scalar(ElementType::I64);
    let value = site
        .execute(&ctx, &Address::Global(runtime_types::GlobalId(7)))
        .unwrap();
    assert_eq!(value, RuntimeValue::I64(99));
}

#[test]
fn test_scalar_foreign_type_mismatch_is_recoverable() {
    #[derive(Debug)]
    struct StringObject;
    impl ForeignObject for StringObject {
        fn read(&self, _offset: u64, _ty: ElementType) -> Result<HostValue, RuntimeError> {
            Ok(HostValue::Str("not a float".to_string()))
        }
    }

    let ctx = RuntimeContext::with_memory_capacity(4096);
    let site = LoadSite::new_scalar(ElementType::F64);
    let err = site
        .execute(
            &ctx,
            &Address::Foreign(ForeignPointer::new(Rc::new(StringObject))),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
}

// ============================================================================
// Call tests
// ============================================================================

fn echo_descriptor(signature: FunctionSignature) -> Rc<FunctionDescriptor> {
    FunctionDescriptor::interpreted(
        "echo",
        signature,
        InterpretedFunction::new(|args| {
            Ok(args[1].value().expect("value argument").clone())
        }),
    )
}

/// Property 3: packing, invoking, and unpacking round-trips argument
/// values for each scalar element type.
#[test]
fn test_call_round_trip_per_element_type() {
    let ctx = RuntimeContext::with_memory_capacity(4096);

    let cases = [
        (ElementType::Bool, HostValue::Bool(true), HostValue::Bool(true)),
        (ElementType::I8, HostValue::Int(-5), HostValue::Int(-5)),
        (ElementType::I16, HostValue::Int(300), HostValue::Int(300)),
        (ElementType::I32, HostValue::Int(70_000), HostValue::Int(70_000)),
        (
            ElementType::I64,
            HostValue::Int(1 << 40),
            HostValue::Int(1 << 40),
        ),
        (
            ElementType::F32,
            HostValue::Float(1.5),
            HostValue::Float(1.5),
        ),
        (
            ElementType::F64,
            HostValue::Float(-2.25),
            HostValue::Float(-2.25),
        ),
        (
            ElementType::Pointer,
            HostValue::Int(0x4000),
            HostValue::Int(0x4000),
        ),
    ];

    for (ty, input, expected) in cases {
        let descriptor = echo_descriptor(FunctionSignature::new(Some(ty), vec![ty]));
        let mut site = ForeignCallSite::new();
        let result = site.execute(&ctx, &descriptor, &[input]).unwrap();
        assert_eq!(result, expected, "round trip failed for {}", ty);
    }
}

/// Property 4: an arity failure leaks no stack frame.
#[test]
fn test_arity_failure_leaks_no_frame() {
    let ctx = RuntimeContext::with_memory_capacity(4096);
    let descriptor = echo_descriptor(FunctionSignature::new(
        Some(ElementType::I32),
        vec![ElementType::I32, ElementType::I32],
    ));
    let mut site = ForeignCallSite::new();
    let stack = ctx.threading_stack().for_current_thread();

    let before = stack.depth();
    let err = site
        .execute(&ctx, &descriptor, &[HostValue::Int(1)])
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Arity {
            expected: 2,
            actual: 1
        }
    );
    assert_eq!(stack.depth(), before);
}

/// Property 7: a 2-parameter callable with 3 supplied arguments packs
/// the extra argument through the generic converter; the callee sees
/// exactly 3 post-frame arguments.
#[test]
fn test_spillover_argument_uses_any_converter() {
    let ctx = RuntimeContext::with_memory_capacity(4096);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_in_body = Rc::clone(&seen);

    let descriptor = FunctionDescriptor::interpreted(
        "varargs",
        FunctionSignature::variadic(
            Some(ElementType::I32),
            vec![ElementType::I32, ElementType::I32],
        ),
        InterpretedFunction::new(move |args| {
            let values: Vec<RuntimeValue> =
                args[1..].iter().map(|a| a.value().unwrap().clone()).collect();
            seen_in_body.borrow_mut().push(values);
            Ok(RuntimeValue::I32(0))
        }),
    );

    let mut site = ForeignCallSite::new();
    site.execute(
        &ctx,
        &descriptor,
        &[HostValue::Int(1), HostValue::Int(2), HostValue::Int(3)],
    )
    .unwrap();

    let calls = seen.borrow();
    assert_eq!(calls.len(), 1);
    let args = &calls[0];
    assert_eq!(args.len(), 3);
    // Declared parameters went through their i32 converters.
    assert_eq!(args[0], RuntimeValue::I32(1));
    assert_eq!(args[1], RuntimeValue::I32(2));
    // The spillover argument went through the generic converter.
    assert_eq!(args[2], RuntimeValue::I64(3));
}

#[test]
fn test_callee_sees_frame_as_argument_zero() {
    let ctx = RuntimeContext::with_memory_capacity(4096);
    let descriptor = FunctionDescriptor::interpreted(
        "wants_frame",
        FunctionSignature::new(None, vec![]),
        InterpretedFunction::new(|args| {
            assert!(args[0].frame().is_some());
            Ok(RuntimeValue::I64(0))
        }),
    );
    let mut site = ForeignCallSite::new();
    site.execute(&ctx, &descriptor, &[]).unwrap();
}

#[test]
fn test_intrinsic_descriptor_called_through_cached_target() {
    let ctx = RuntimeContext::with_memory_capacity(4096);
    let signature = FunctionSignature::new(Some(ElementType::I64), vec![ElementType::I64]);
    let intrinsic = NativeIntrinsic::new(|_sig| {
        InterpretedFunction::new(|args| match args[1].value() {
            Some(RuntimeValue::I64(n)) => Ok(RuntimeValue::I64(n + 1)),
            other => panic!("unexpected argument {:?}", other),
        })
    });
    let descriptor = FunctionDescriptor::intrinsic("incr", signature, intrinsic);

    let mut site = ForeignCallSite::new();
    assert_eq!(
        site.execute(&ctx, &descriptor, &[HostValue::Int(41)]).unwrap(),
        HostValue::Int(42)
    );
    assert_eq!(
        site.execute(&ctx, &descriptor, &[HostValue::Int(1)]).unwrap(),
        HostValue::Int(2)
    );
}

#[test]
fn test_callee_error_propagates_without_frame_leak() {
    let ctx = RuntimeContext::with_memory_capacity(4096);
    let descriptor = FunctionDescriptor::interpreted(
        "fails",
        FunctionSignature::new(None, vec![]),
        InterpretedFunction::new(|_| {
            Err(RuntimeError::Internal("callee failure".to_string()))
        }),
    );
    let mut site = ForeignCallSite::new();
    let stack = ctx.threading_stack().for_current_thread();

    let err = site.execute(&ctx, &descriptor, &[]).unwrap_err();
    assert!(matches!(err, RuntimeError::Internal(_)));
    assert_eq!(stack.depth(), 0);
}
