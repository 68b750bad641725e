//! Execution context for the foreign boundary.
//!
//! One [`RuntimeContext`] holds the state shared by every load and call
//! site of one logical execution context: its native memory, its global
//! registry, its deref-handle registry, and the per-thread stack
//! registry. Contexts are single-threaded; only the stack registry is
//! shared across threads.

use std::cell::RefCell;
use std::sync::Arc;

use native_memory::{GlobalStore, NativeMemory, ThreadingStack};
use runtime_types::{
    ForeignPointer, ForeignRef, NativeAddress, RuntimeError, DEREF_HANDLE_SPACE_START,
};

/// Registry resolving auto-deref handles to their foreign receivers.
///
/// A handle is a native-address encoding in the reserved handle space.
/// The receiver lookup happens at most once per read; entries are
/// written once at handle creation and never change.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    receivers: RefCell<Vec<ForeignRef>>,
}

impl HandleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        HandleRegistry {
            receivers: RefCell::new(Vec::new()),
        }
    }

    /// Allocate a fresh handle denoting `receiver`.
    pub fn create(&self, receiver: ForeignRef) -> NativeAddress {
        let mut receivers = self.receivers.borrow_mut();
        let index = receivers.len() as u64;
        receivers.push(receiver);
        NativeAddress::new(DEREF_HANDLE_SPACE_START | index)
    }

    /// Resolve a handle to a pointer at offset 0 of its receiver.
    ///
    /// A handle with no registered receiver is a linkage defect.
    pub fn resolve(&self, handle: NativeAddress) -> Result<ForeignPointer, RuntimeError> {
        let index = (handle.raw() & !DEREF_HANDLE_SPACE_START) as usize;
        self.receivers
            .borrow()
            .get(index)
            .map(|receiver| ForeignPointer::new(receiver.clone()))
            .ok_or_else(|| {
                RuntimeError::Internal(format!("deref handle {} is not registered", handle))
            })
    }
}

/// Shared state of one execution context.
#[derive(Debug)]
pub struct RuntimeContext {
    memory: NativeMemory,
    globals: GlobalStore,
    handles: HandleRegistry,
    threading_stack: Arc<ThreadingStack>,
}

impl RuntimeContext {
    /// Create a context with default-sized memory and stacks.
    pub fn new() -> Self {
        RuntimeContext {
            memory: NativeMemory::new(),
            globals: GlobalStore::new(),
            handles: HandleRegistry::new(),
            threading_stack: Arc::new(ThreadingStack::new()),
        }
    }

    /// Create a context with an explicit native memory capacity.
    pub fn with_memory_capacity(capacity: usize) -> Self {
        RuntimeContext {
            memory: NativeMemory::with_capacity(capacity),
            globals: GlobalStore::new(),
            handles: HandleRegistry::new(),
            threading_stack: Arc::new(ThreadingStack::new()),
        }
    }

    /// The context's native memory.
    pub fn memory(&self) -> &NativeMemory {
        &self.memory
    }

    /// The context's global variable registry.
    pub fn globals(&self) -> &GlobalStore {
        &self.globals
    }

    /// The context's deref-handle registry.
    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    /// The per-thread stack registry for this context.
    pub fn threading_stack(&self) -> &Arc<ThreadingStack> {
        &self.threading_stack
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new()
    }
}
