//! Contract tests for the foreign-boundary API
//!
//! These tests verify the public API matches the contract specification.

use std::rc::Rc;

use foreign_boundary::{
    resolve_address, ForeignCallSite, FunctionDescriptor, FunctionSignature, InterpretedFunction,
    LoadSite, ResolvedAddress, RuntimeContext,
};
use runtime_types::{
    Address, ElementType, ForeignObject, ForeignPointer, HostValue, NativeAddress, RuntimeError,
    RuntimeValue,
};

#[derive(Debug)]
struct Managed;

impl ForeignObject for Managed {
    fn read(&self, _offset: u64, _ty: ElementType) -> Result<HostValue, RuntimeError> {
        Ok(HostValue::Int(0))
    }
}

/// Test RuntimeContext::new() returns a usable context
#[test]
fn test_runtime_context_new_contract() {
    let ctx = RuntimeContext::new();
    let addr = ctx.memory().allocate(8, 8);
    ctx.memory().put_i64(addr, 1);
    assert_eq!(ctx.memory().get_i64(addr), 1);
}

/// Test resolve_address() classifies without reading memory
#[test]
fn test_resolve_address_contract() {
    let ctx = RuntimeContext::with_memory_capacity(4096);

    let native = resolve_address(&ctx, &Address::Native(NativeAddress::new(0x100))).unwrap();
    assert!(matches!(native, ResolvedAddress::Native(_)));

    let managed =
        resolve_address(&ctx, &Address::Foreign(ForeignPointer::new(Rc::new(Managed)))).unwrap();
    assert!(matches!(managed, ResolvedAddress::Managed(_)));
}

/// Test LoadSite keeps its static shape
#[test]
fn test_load_site_shape_contract() {
    let scalar = LoadSite::new_scalar(ElementType::F32);
    assert_eq!(scalar.element_type(), ElementType::F32);
    assert_eq!(scalar.lane_count(), None);

    let vector = LoadSite::new_vector(ElementType::I16, 8);
    assert_eq!(vector.element_type(), ElementType::I16);
    assert_eq!(vector.lane_count(), Some(8));
}

/// Test LoadSite::execute() returns a value for valid native loads
#[test]
fn test_load_site_execute_contract() {
    let ctx = RuntimeContext::with_memory_capacity(4096);
    let addr = ctx.memory().allocate(4, 4);
    ctx.memory().put_i32(addr, 11);

    let site = LoadSite::new_scalar(ElementType::I32);
    let result = site.execute(&ctx, &Address::Native(addr));
    assert!(result.is_ok(), "execute should return Ok for valid loads");
    assert_eq!(result.unwrap(), RuntimeValue::I32(11));
}

/// Test FunctionDescriptor exposes name and signature
#[test]
fn test_function_descriptor_contract() {
    let signature = FunctionSignature::new(Some(ElementType::I64), vec![ElementType::I64]);
    let descriptor = FunctionDescriptor::interpreted(
        "identity",
        signature.clone(),
        InterpretedFunction::new(|args| Ok(args[1].value().unwrap().clone())),
    );

    assert_eq!(descriptor.name(), "identity");
    assert_eq!(descriptor.signature(), &signature);
    assert!(descriptor.is_interpreted());
}

/// Test ForeignCallSite::execute() returns a host-visible value
#[test]
fn test_call_site_execute_contract() {
    let ctx = RuntimeContext::new();
    let descriptor = FunctionDescriptor::interpreted(
        "one",
        FunctionSignature::new(Some(ElementType::I32), vec![]),
        InterpretedFunction::new(|_| Ok(RuntimeValue::I32(1))),
    );

    let mut site = ForeignCallSite::new();
    let result = site.execute(&ctx, &descriptor, &[]);
    assert!(result.is_ok(), "execute should return Ok for valid calls");
    assert_eq!(result.unwrap(), HostValue::Int(1));
}

/// Test error values carry the reported counts
#[test]
fn test_arity_error_reports_counts_contract() {
    let ctx = RuntimeContext::new();
    let descriptor = FunctionDescriptor::interpreted(
        "two_params",
        FunctionSignature::new(None, vec![ElementType::I32, ElementType::I32]),
        InterpretedFunction::new(|_| Ok(RuntimeValue::I64(0))),
    );

    let mut site = ForeignCallSite::new();
    match site.execute(&ctx, &descriptor, &[]).unwrap_err() {
        RuntimeError::Arity { expected, actual } => {
            assert_eq!(expected, 2);
            assert_eq!(actual, 0);
        }
        other => panic!("unexpected error {:?}", other),
    }
}
