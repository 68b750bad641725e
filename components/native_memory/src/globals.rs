//! Global variable backing store.
//!
//! A global reference resolves to a concrete backing location the first
//! time it is used. The store is append-only: each symbol is written at
//! most once, and resolved entries are safe to reuse across loads.

use std::cell::RefCell;
use std::collections::HashMap;

use runtime_types::{ForeignPointer, GlobalId, NativeAddress, RuntimeError};

/// The concrete location backing one global variable.
#[derive(Debug, Clone)]
pub enum GlobalBacking {
    /// The global lives in native memory
    Native(NativeAddress),
    /// The global is held by a host-managed object
    Managed(ForeignPointer),
}

/// Registry of module-level globals for one execution context.
#[derive(Debug, Default)]
pub struct GlobalStore {
    entries: RefCell<HashMap<GlobalId, GlobalBacking>>,
}

impl GlobalStore {
    /// Create an empty store.
    pub fn new() -> Self {
        GlobalStore {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Register a native-backed global.
    ///
    /// # Panics
    ///
    /// Panics if `id` is already registered; entries are written once.
    pub fn define_native(&self, id: GlobalId, address: NativeAddress) {
        self.define(id, GlobalBacking::Native(address));
    }

    /// Register a global held by a host-managed object.
    ///
    /// # Panics
    ///
    /// Panics if `id` is already registered; entries are written once.
    pub fn define_managed(&self, id: GlobalId, pointer: ForeignPointer) {
        self.define(id, GlobalBacking::Managed(pointer));
    }

    fn define(&self, id: GlobalId, backing: GlobalBacking) {
        let previous = self.entries.borrow_mut().insert(id, backing);
        if previous.is_some() {
            panic!("Global {:?} registered twice", id);
        }
    }

    /// Resolve a global reference to its backing location.
    ///
    /// An unregistered symbol is a linkage defect from the loader and
    /// surfaces as an internal error.
    pub fn resolve(&self, id: GlobalId) -> Result<GlobalBacking, RuntimeError> {
        self.entries
            .borrow()
            .get(&id)
            .cloned()
            .ok_or_else(|| RuntimeError::Internal(format!("global {:?} is not registered", id)))
    }
}
