//! Structural creator registry

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{read_lock, write_lock};
use crate::atom::{AtomGraph, ObjectId};
use crate::config::DuplicatePolicy;
use crate::error::{PatchError, Result};
use crate::patch::Creator;
use crate::version::VersionId;

/// Creators keyed by the (classname, version) they build
#[derive(Default)]
pub struct StructuralCreatorDb {
    policy: DuplicatePolicy,
    creators: RwLock<HashMap<VersionId, Arc<dyn Creator>>>,
}

impl StructuralCreatorDb {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            creators: RwLock::new(HashMap::new()),
        }
    }

    /// Register a creator under its (classname, version)
    pub fn register_creator(&self, creator: Arc<dyn Creator>) -> Result<()> {
        let id = creator.id();
        let mut creators = write_lock(&self.creators);

        if creators.contains_key(&id) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    return Err(PatchError::DuplicateRegistration {
                        kind: "creator",
                        key: id.to_string(),
                    });
                }
                DuplicatePolicy::Replace => {
                    tracing::debug!(creator = %id, "replacing registered creator");
                }
            }
        }

        tracing::debug!(creator = %id, "registered creator");
        creators.insert(id, creator);
        Ok(())
    }

    pub fn get_creator(&self, classname: &str, version: &str) -> Option<Arc<dyn Creator>> {
        read_lock(&self.creators)
            .get(&VersionId::new(classname, version))
            .cloned()
    }

    /// Build a default object of `classname`@`version` in `graph`.
    ///
    /// # Panics
    ///
    /// Panics if no creator is registered for the pair. A patch that needs a
    /// type nobody can instantiate is a registration bug.
    pub fn create(&self, graph: &mut AtomGraph, classname: &str, version: &str) -> ObjectId {
        let Some(creator) = self.get_creator(classname, version) else {
            panic!("no creator registered for {}@{}", classname, version);
        };

        let id = creator.create(graph, self);
        tracing::debug!(classname, version, object = %id, "created default object");
        id
    }

    pub fn contains(&self, classname: &str, version: &str) -> bool {
        read_lock(&self.creators).contains_key(&VersionId::new(classname, version))
    }

    pub fn len(&self) -> usize {
        read_lock(&self.creators).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<VersionId> {
        let mut keys: Vec<_> = read_lock(&self.creators).keys().cloned().collect();
        keys.sort();
        keys
    }
}
