//! Per-thread execution stacks and scoped frame acquisition.
//!
//! Each execution thread owns one private [`Stack`]; the registry that
//! hands them out is keyed by thread identity and never shares a stack
//! across threads. Frames are acquired as RAII guards: the frame is
//! released when the guard drops, on every exit path, so no frame can
//! outlive its call even under error propagation or panic unwinding.

use std::alloc::{alloc, dealloc, Layout};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use runtime_types::NativeAddress;

/// Default size of one thread's stack, in bytes.
pub const DEFAULT_STACK_SIZE: usize = 1024 * 1024;

/// Frame pointers are aligned down to this boundary.
const FRAME_ALIGNMENT: u64 = 16;

#[derive(Debug)]
struct StackState {
    /// Current stack pointer; the stack grows downward
    stack_pointer: u64,
    /// Number of live frames
    depth: usize,
}

/// One thread's execution stack.
///
/// Owns a native memory region. Frames are bump-allocated downward from
/// the top and released strictly LIFO by dropping their guards.
#[derive(Debug)]
pub struct Stack {
    base: *mut u8,
    size: usize,
    state: Mutex<StackState>,
}

// SAFETY: the region behind `base` is owned exclusively by this Stack
// and is only manipulated through the mutex-guarded stack pointer.
unsafe impl Send for Stack {}
// SAFETY: as above; all mutation goes through `state`.
unsafe impl Sync for Stack {}

impl Stack {
    /// Allocate a stack of `size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if memory allocation fails.
    pub fn new(size: usize) -> Self {
        let layout = Layout::from_size_align(size, 16).expect("Invalid layout");
        // SAFETY: We're allocating a new block of memory with proper alignment
        let base = unsafe { alloc(layout) };
        if base.is_null() {
            panic!("Failed to allocate stack of size {}", size);
        }

        let top = base as u64 + size as u64;
        Stack {
            base,
            size,
            state: Mutex::new(StackState {
                stack_pointer: top,
                depth: 0,
            }),
        }
    }

    /// Acquire a frame scoped to one call.
    ///
    /// The returned guard restores the stack pointer and the frame count
    /// when dropped. Guards must be released in LIFO order.
    pub fn new_frame(self: &Arc<Self>) -> FrameGuard {
        let mut state = self.state.lock();
        let saved = state.stack_pointer;
        let frame = saved & !(FRAME_ALIGNMENT - 1);
        state.stack_pointer = frame;
        state.depth += 1;
        FrameGuard {
            stack: Arc::clone(self),
            saved_stack_pointer: saved,
            frame_pointer: frame,
        }
    }

    /// Number of frames currently live on this stack.
    pub fn depth(&self) -> usize {
        self.state.lock().depth
    }

    /// Total capacity of the stack region in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        let layout = Layout::from_size_align(self.size, 16).expect("Invalid layout");
        // SAFETY: We're deallocating memory we allocated in new()
        unsafe {
            dealloc(self.base, layout);
        }
    }
}

/// RAII guard for one call's stack frame.
///
/// Holding the guard keeps the frame alive; dropping it releases the
/// frame deterministically, including during error propagation.
#[derive(Debug)]
pub struct FrameGuard {
    stack: Arc<Stack>,
    saved_stack_pointer: u64,
    frame_pointer: u64,
}

impl FrameGuard {
    /// The handle passed to the callee as packed argument 0.
    pub fn handle(&self) -> FrameHandle {
        FrameHandle {
            frame_pointer: NativeAddress::new(self.frame_pointer),
        }
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        let mut state = self.stack.state.lock();
        state.stack_pointer = self.saved_stack_pointer;
        state.depth -= 1;
    }
}

/// The callee-visible identity of a stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHandle {
    frame_pointer: NativeAddress,
}

impl FrameHandle {
    /// The frame's base address on its thread's stack.
    pub fn frame_pointer(&self) -> NativeAddress {
        self.frame_pointer
    }
}

/// Registry of per-thread stacks for one execution context.
///
/// Lazily creates a stack the first time a thread asks for one; every
/// later request from the same thread returns the same stack.
#[derive(Debug)]
pub struct ThreadingStack {
    stack_size: usize,
    stacks: Mutex<HashMap<ThreadId, Arc<Stack>>>,
}

impl ThreadingStack {
    /// Create a registry handing out stacks of the default size.
    pub fn new() -> Self {
        Self::with_stack_size(DEFAULT_STACK_SIZE)
    }

    /// Create a registry handing out stacks of `stack_size` bytes.
    pub fn with_stack_size(stack_size: usize) -> Self {
        ThreadingStack {
            stack_size,
            stacks: Mutex::new(HashMap::new()),
        }
    }

    /// The calling thread's private stack.
    pub fn for_current_thread(&self) -> Arc<Stack> {
        let mut stacks = self.stacks.lock();
        Arc::clone(
            stacks
                .entry(thread::current().id())
                .or_insert_with(|| Arc::new(Stack::new(self.stack_size))),
        )
    }
}

impl Default for ThreadingStack {
    fn default() -> Self {
        Self::new()
    }
}
