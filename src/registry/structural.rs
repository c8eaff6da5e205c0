//! Structural patch registry

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{read_lock, write_lock};
use crate::config::DuplicatePolicy;
use crate::error::{PatchError, Result};
use crate::patch::StructuralPatch;
use crate::version::{PatchKey, VersionId};

/// Structural patches keyed by their full (origin, target) edge
#[derive(Default)]
pub struct StructuralPatchDb {
    policy: DuplicatePolicy,
    patches: RwLock<HashMap<PatchKey, Arc<dyn StructuralPatch>>>,
}

impl StructuralPatchDb {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            patches: RwLock::new(HashMap::new()),
        }
    }

    pub fn register_patch(&self, patch: Arc<dyn StructuralPatch>) -> Result<()> {
        let key = patch.key();
        let mut patches = write_lock(&self.patches);

        if patches.contains_key(&key) && self.policy == DuplicatePolicy::Reject {
            return Err(PatchError::DuplicateRegistration {
                kind: "structural patch",
                key: key.to_string(),
            });
        }

        tracing::debug!(patch = %key, "registered structural patch");
        patches.insert(key, patch);
        Ok(())
    }

    pub fn get_patch(
        &self,
        origin_classname: &str,
        origin_version: &str,
        target_classname: &str,
        target_version: &str,
    ) -> Option<Arc<dyn StructuralPatch>> {
        self.get(&PatchKey::new(
            VersionId::new(origin_classname, origin_version),
            VersionId::new(target_classname, target_version),
        ))
    }

    pub fn get(&self, key: &PatchKey) -> Option<Arc<dyn StructuralPatch>> {
        read_lock(&self.patches).get(key).cloned()
    }

    pub fn contains(&self, key: &PatchKey) -> bool {
        read_lock(&self.patches).contains_key(key)
    }

    pub fn len(&self) -> usize {
        read_lock(&self.patches).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<PatchKey> {
        let mut keys: Vec<_> = read_lock(&self.patches).keys().cloned().collect();
        keys.sort();
        keys
    }
}
