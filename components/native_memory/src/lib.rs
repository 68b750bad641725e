//! Native memory subsystem - typed memory, globals, and thread stacks
//!
//! This component provides:
//! - Arena-backed directly addressable memory with exact-width typed
//!   scalar access and bulk vector reads
//! - The global variable backing store with once-per-symbol resolution
//! - Per-thread execution stacks with RAII frame guards

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
pub mod globals;
pub mod memory;
pub mod stack;

// Re-export main types
pub use arena::Arena;
pub use globals::{GlobalBacking, GlobalStore};
pub use memory::{NativeMemory, NativeScalar, DEFAULT_MEMORY_CAPACITY};
pub use stack::{FrameGuard, FrameHandle, Stack, ThreadingStack, DEFAULT_STACK_SIZE};
