use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use pdr_types::Did;

/// Per-DID writer serialization.
///
/// Writers for the same DID take turns; writers for different DIDs never
/// block each other beyond the brief registry lookup. Entries are created on
/// first use and kept for the life of the registry.
#[derive(Default)]
pub struct DidLocks {
    locks: Mutex<HashMap<Did, Arc<Mutex<()>>>>,
}

impl DidLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, did: &Did) -> Arc<Mutex<()>> {
        // The map only holds Arcs, so a poisoned registry is still consistent.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(did.clone()).or_default())
    }

    /// Run `f` while holding `did`'s writer lock.
    pub fn with_lock<T>(&self, did: &Did, f: impl FnOnce() -> T) -> T {
        let lock = self.entry(did);
        // Nothing is guarded but the turn itself, so poisoning is harmless.
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of DIDs that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DidLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DidLocks").field("dids", &self.len()).finish()
    }
}
