//! Foreign call dispatch: argument packing and invocation.
//!
//! A [`ForeignCallSite`] is the entry point used when host code invokes
//! an interpretable or intrinsic function. It follows the inline-cache
//! state machine used elsewhere in the runtime: a bounded number of
//! (descriptor, argument count) pairs are cached with prebuilt fast
//! packers and directly resolved targets; once the cache overflows, the
//! site falls back to the general path permanently.
//!
//! Every invocation acquires a stack frame scoped to exactly that call.
//! The frame guard is released on all exit paths, including conversion
//! errors and callee panics, so no frame can leak.

use std::cell::OnceCell;
use std::rc::Rc;
use std::sync::Arc;

use arrayvec::ArrayVec;
use host_interop::{prepare_for_escape, Converter, SlowPathConverter};
use native_memory::{FrameHandle, NativeMemory, Stack, ThreadingStack};
use runtime_types::{HostValue, RuntimeError, RuntimeValue};

use crate::callable::{CallTarget, FunctionDescriptor};
use crate::context::RuntimeContext;

/// Cached (descriptor, argument count) pairs per call site.
const CALL_CACHE_LIMIT: usize = 3;

/// One entry of the packed argument list handed to a call target.
///
/// Argument 0 is always the caller's stack-frame handle; the converted
/// arguments follow in order.
#[derive(Debug, Clone, PartialEq)]
pub enum PackedArg {
    /// The stack-frame handle prepended to every call
    Frame(FrameHandle),
    /// One converted argument value
    Value(RuntimeValue),
}

impl PackedArg {
    /// The argument value, if this entry is one.
    pub fn value(&self) -> Option<&RuntimeValue> {
        match self {
            PackedArg::Value(value) => Some(value),
            PackedArg::Frame(_) => None,
        }
    }

    /// The frame handle, if this entry is one.
    pub fn frame(&self) -> Option<FrameHandle> {
        match self {
            PackedArg::Frame(handle) => Some(*handle),
            PackedArg::Value(_) => None,
        }
    }
}

fn check_arg_length(min_length: usize, actual_length: usize) -> Result<(), RuntimeError> {
    if actual_length < min_length {
        return Err(RuntimeError::Arity {
            expected: min_length,
            actual: actual_length,
        });
    }
    Ok(())
}

/// The fast argument packer, specialized per (descriptor, count) pair.
///
/// Valid only while descriptor and argument count stay stable call to
/// call: one stateless converter is built per declared parameter type,
/// spillover slots get the generic "any" converter, and the same
/// converters are reused on every pack.
#[derive(Debug)]
pub struct PackArguments {
    converters: Vec<Converter>,
}

impl PackArguments {
    /// Build converters for `argument_count` arguments of `descriptor`.
    ///
    /// Fails fast with an arity error when fewer arguments are supplied
    /// than the descriptor declares.
    pub fn create(
        descriptor: &FunctionDescriptor,
        argument_count: usize,
    ) -> Result<Self, RuntimeError> {
        let parameter_types = descriptor.signature().parameter_types();
        check_arg_length(parameter_types.len(), argument_count)?;

        let mut converters = Vec::with_capacity(argument_count);
        for ty in parameter_types {
            converters.push(Converter::for_type(*ty));
        }
        for _ in parameter_types.len()..argument_count {
            converters.push(Converter::any());
        }
        Ok(PackArguments { converters })
    }

    /// Convert `arguments` and prepend the frame handle.
    pub fn pack(
        &self,
        arguments: &[HostValue],
        frame: FrameHandle,
    ) -> Result<Vec<PackedArg>, RuntimeError> {
        debug_assert_eq!(arguments.len(), self.converters.len());
        let mut packed = Vec::with_capacity(1 + self.converters.len());
        packed.push(PackedArg::Frame(frame));
        for (converter, argument) in self.converters.iter().zip(arguments) {
            packed.push(PackedArg::Value(converter.convert(argument)?));
        }
        Ok(packed)
    }
}

/// The general argument packer used on the fallback path.
///
/// Recomputes the actual argument count as the maximum of the supplied
/// and declared counts on every call, and converts declared slots with
/// the type-directed slow conversion, which may consult live memory.
#[derive(Debug, Default)]
pub struct SlowPackArguments {
    convert: SlowPathConverter,
}

impl SlowPackArguments {
    /// Create the general packer.
    pub fn new() -> Self {
        SlowPackArguments {
            convert: SlowPathConverter::new(),
        }
    }

    /// Convert `arguments` for `descriptor` and prepend the frame handle.
    pub fn pack(
        &self,
        descriptor: &FunctionDescriptor,
        memory: &NativeMemory,
        arguments: &[HostValue],
        frame: FrameHandle,
    ) -> Result<Vec<PackedArg>, RuntimeError> {
        let parameter_types = descriptor.signature().parameter_types();
        check_arg_length(parameter_types.len(), arguments.len())?;

        let actual_length = arguments.len().max(parameter_types.len());
        let mut packed = Vec::with_capacity(1 + actual_length);
        packed.push(PackedArg::Frame(frame));
        for (ty, argument) in parameter_types.iter().zip(arguments) {
            packed.push(PackedArg::Value(self.convert.convert(*ty, memory, argument)?));
        }
        for argument in &arguments[parameter_types.len()..] {
            packed.push(PackedArg::Value(self.convert.convert_any(argument)));
        }
        Ok(packed)
    }
}

#[derive(Debug)]
struct CachedCall {
    descriptor: Rc<FunctionDescriptor>,
    argument_count: usize,
    pack: PackArguments,
    target: Rc<dyn CallTarget>,
}

impl CachedCall {
    fn matches(&self, descriptor: &Rc<FunctionDescriptor>, argument_count: usize) -> bool {
        Rc::ptr_eq(&self.descriptor, descriptor) && self.argument_count == argument_count
    }
}

#[derive(Debug)]
enum CallSiteState {
    /// Bounded cache of stable (descriptor, count) pairs
    Cached(ArrayVec<CachedCall, CALL_CACHE_LIMIT>),
    /// Cache overflowed; always take the general path
    Generic,
}

/// The call entry point used when host code invokes a function.
#[derive(Debug)]
pub struct ForeignCallSite {
    state: CallSiteState,
    /// Context's stack registry, fetched lazily on first call
    threading_stack: OnceCell<Arc<ThreadingStack>>,
    slow_pack: SlowPackArguments,
}

impl ForeignCallSite {
    /// Create a call site with an empty cache.
    pub fn new() -> Self {
        ForeignCallSite {
            state: CallSiteState::Cached(ArrayVec::new()),
            threading_stack: OnceCell::new(),
            slow_pack: SlowPackArguments::new(),
        }
    }

    /// Whether this site has fallen back to the general path.
    pub fn is_generic(&self) -> bool {
        matches!(self.state, CallSiteState::Generic)
    }

    /// Invoke `descriptor` with host-supplied `arguments`.
    ///
    /// Resolves the entry point, packs the arguments behind a freshly
    /// acquired stack frame, performs the call, and converts the result
    /// into a host-visible value.
    pub fn execute(
        &mut self,
        ctx: &RuntimeContext,
        descriptor: &Rc<FunctionDescriptor>,
        arguments: &[HostValue],
    ) -> Result<HostValue, RuntimeError> {
        let stack = self
            .threading_stack
            .get_or_init(|| Arc::clone(ctx.threading_stack()))
            .for_current_thread();

        if let CallSiteState::Cached(entries) = &mut self.state {
            if let Some(entry) = entries
                .iter()
                .find(|e| e.matches(descriptor, arguments.len()))
            {
                return direct_call(&stack, &entry.pack, entry.target.as_ref(), arguments);
            }
            if entries.len() < CALL_CACHE_LIMIT {
                // Arity failures propagate before anything is cached.
                let pack = PackArguments::create(descriptor, arguments.len())?;
                let entry = CachedCall {
                    descriptor: Rc::clone(descriptor),
                    argument_count: arguments.len(),
                    target: descriptor.call_target(),
                    pack,
                };
                let result = direct_call(&stack, &entry.pack, entry.target.as_ref(), arguments);
                entries.push(entry);
                return result;
            }
            self.state = CallSiteState::Generic;
        }

        self.indirect_call(ctx, &stack, descriptor, arguments)
    }

    fn indirect_call(
        &self,
        ctx: &RuntimeContext,
        stack: &Arc<Stack>,
        descriptor: &Rc<FunctionDescriptor>,
        arguments: &[HostValue],
    ) -> Result<HostValue, RuntimeError> {
        let target = descriptor.call_target();
        let result = {
            let frame = stack.new_frame();
            let packed = self
                .slow_pack
                .pack(descriptor, ctx.memory(), arguments, frame.handle())?;
            target.call(&packed)
        };
        Ok(prepare_for_escape(result?))
    }
}

impl Default for ForeignCallSite {
    fn default() -> Self {
        Self::new()
    }
}

fn direct_call(
    stack: &Arc<Stack>,
    pack: &PackArguments,
    target: &dyn CallTarget,
    arguments: &[HostValue],
) -> Result<HostValue, RuntimeError> {
    let result = {
        let frame = stack.new_frame();
        let packed = pack.pack(arguments, frame.handle())?;
        target.call(&packed)
    };
    Ok(prepare_for_escape(result?))
}
