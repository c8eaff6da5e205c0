//! Patch and creator registries
//!
//! Plain associative maps, each behind its own `RwLock`. Registration takes
//! the write lock, lookups take the read lock. Entries are cloned out as
//! `Arc`s before being invoked, so no registry lock is held while a patch or
//! creator body runs and registries never call into each other while locked.

mod creators;
mod semantic;
mod structural;

pub use creators::StructuralCreatorDb;
pub use semantic::{SemanticPatchDb, SemanticPatchRegistry};
pub use structural::StructuralPatchDb;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared read access. A registry is only written during registration, so a
/// poisoned lock still holds consistent data and is recovered.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive access, recovered from poisoning like [`read_lock`]
pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
