//! Callable descriptors and call target resolution.
//!
//! A descriptor identifies a function crossing the boundary: either it
//! has an interpretable body, or it names a native intrinsic with
//! precompiled targets keyed by signature. Exactly one of the two holds
//! for any callable this subsystem accepts; anything else is a linkage
//! defect from the loader and aborts.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use runtime_types::{ElementType, RuntimeError, RuntimeValue};

use crate::call::PackedArg;

/// A callable's argument and return types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    return_type: Option<ElementType>,
    parameter_types: Vec<ElementType>,
    variadic: bool,
}

impl FunctionSignature {
    /// Signature with a fixed parameter list.
    pub fn new(return_type: Option<ElementType>, parameter_types: Vec<ElementType>) -> Self {
        FunctionSignature {
            return_type,
            parameter_types,
            variadic: false,
        }
    }

    /// Signature accepting spillover arguments past the declared list.
    pub fn variadic(return_type: Option<ElementType>, parameter_types: Vec<ElementType>) -> Self {
        FunctionSignature {
            variadic: true,
            ..Self::new(return_type, parameter_types)
        }
    }

    /// Declared parameter types.
    pub fn parameter_types(&self) -> &[ElementType] {
        &self.parameter_types
    }

    /// Declared return type, `None` for void.
    pub fn return_type(&self) -> Option<ElementType> {
        self.return_type
    }

    /// Whether the callable accepts spillover arguments.
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }
}

/// An invocable entry point.
///
/// The first packed argument is always the caller's stack-frame handle;
/// the remaining entries are the converted arguments.
pub trait CallTarget {
    /// Run the target with the packed argument list.
    fn call(&self, arguments: &[PackedArg]) -> Result<RuntimeValue, RuntimeError>;
}

impl fmt::Debug for dyn CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallTarget(...)")
    }
}

/// An interpretable function body.
pub struct InterpretedFunction {
    body: Box<dyn Fn(&[PackedArg]) -> Result<RuntimeValue, RuntimeError>>,
}

impl InterpretedFunction {
    /// Wrap an interpretable body as a call target.
    pub fn new(
        body: impl Fn(&[PackedArg]) -> Result<RuntimeValue, RuntimeError> + 'static,
    ) -> Rc<dyn CallTarget> {
        Rc::new(InterpretedFunction {
            body: Box::new(body),
        })
    }
}

impl CallTarget for InterpretedFunction {
    fn call(&self, arguments: &[PackedArg]) -> Result<RuntimeValue, RuntimeError> {
        (self.body)(arguments)
    }
}

impl fmt::Debug for InterpretedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterpretedFunction(...)")
    }
}

/// A native intrinsic with per-signature precompiled targets.
///
/// Targets are built lazily by the factory and cached by signature;
/// each cache entry is written once.
pub struct NativeIntrinsic {
    factory: Box<dyn Fn(&FunctionSignature) -> Rc<dyn CallTarget>>,
    targets: RefCell<HashMap<FunctionSignature, Rc<dyn CallTarget>>>,
}

impl NativeIntrinsic {
    /// Create an intrinsic whose targets come from `factory`.
    pub fn new(factory: impl Fn(&FunctionSignature) -> Rc<dyn CallTarget> + 'static) -> Self {
        NativeIntrinsic {
            factory: Box::new(factory),
            targets: RefCell::new(HashMap::new()),
        }
    }

    /// The precompiled target for `signature`, built on first use.
    pub fn cached_call_target(&self, signature: &FunctionSignature) -> Rc<dyn CallTarget> {
        let mut targets = self.targets.borrow_mut();
        Rc::clone(
            targets
                .entry(signature.clone())
                .or_insert_with(|| (self.factory)(signature)),
        )
    }

    /// Number of signatures compiled so far.
    pub fn compiled_count(&self) -> usize {
        self.targets.borrow().len()
    }
}

impl fmt::Debug for NativeIntrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeIntrinsic")
            .field("compiled", &self.compiled_count())
            .finish()
    }
}

/// How a callable descriptor is fulfilled.
#[derive(Debug)]
pub enum FunctionKind {
    /// Has an interpretable body
    Interpreted(Rc<dyn CallTarget>),
    /// Has a native intrinsic with signature-keyed targets
    Intrinsic(NativeIntrinsic),
    /// Declared but fulfilled by neither; calling it is a linkage defect
    Unresolved,
}

/// Identifies one function crossing the boundary.
#[derive(Debug)]
pub struct FunctionDescriptor {
    name: String,
    signature: FunctionSignature,
    kind: FunctionKind,
}

impl FunctionDescriptor {
    /// Descriptor for a function with an interpretable body.
    pub fn interpreted(
        name: impl Into<String>,
        signature: FunctionSignature,
        target: Rc<dyn CallTarget>,
    ) -> Rc<Self> {
        Rc::new(FunctionDescriptor {
            name: name.into(),
            signature,
            kind: FunctionKind::Interpreted(target),
        })
    }

    /// Descriptor for a native intrinsic.
    pub fn intrinsic(
        name: impl Into<String>,
        signature: FunctionSignature,
        intrinsic: NativeIntrinsic,
    ) -> Rc<Self> {
        Rc::new(FunctionDescriptor {
            name: name.into(),
            signature,
            kind: FunctionKind::Intrinsic(intrinsic),
        })
    }

    /// Descriptor for a function fulfilled by neither form.
    pub fn unresolved(name: impl Into<String>, signature: FunctionSignature) -> Rc<Self> {
        Rc::new(FunctionDescriptor {
            name: name.into(),
            signature,
            kind: FunctionKind::Unresolved,
        })
    }

    /// The function's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The function's signature.
    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    /// Whether this descriptor has an interpretable body.
    pub fn is_interpreted(&self) -> bool {
        matches!(self.kind, FunctionKind::Interpreted(_))
    }

    /// Resolve the entry point for one invocation.
    ///
    /// # Panics
    ///
    /// Panics for unresolved descriptors: a callable with neither a
    /// body nor an intrinsic indicates a loader defect upstream, and
    /// continuing would silently corrupt execution.
    pub fn call_target(&self) -> Rc<dyn CallTarget> {
        match &self.kind {
            FunctionKind::Interpreted(target) => Rc::clone(target),
            FunctionKind::Intrinsic(intrinsic) => intrinsic.cached_call_target(&self.signature),
            FunctionKind::Unresolved => {
                panic!("native function {} not supported at this point", self.name)
            }
        }
    }
}
