//! Context-scoped semantic patch registries

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{read_lock, write_lock};
use crate::config::DuplicatePolicy;
use crate::error::{PatchError, Result};
use crate::patch::SemanticPatch;
use crate::version::VersionId;

/// Semantic patches of one context, keyed by (classname, version)
pub struct SemanticPatchDb {
    context: String,
    policy: DuplicatePolicy,
    patches: RwLock<HashMap<VersionId, Arc<dyn SemanticPatch>>>,
}

impl SemanticPatchDb {
    pub fn new(context: impl Into<String>, policy: DuplicatePolicy) -> Self {
        Self {
            context: context.into(),
            policy,
            patches: RwLock::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn register_patch(&self, patch: Arc<dyn SemanticPatch>) -> Result<()> {
        let key = VersionId::new(patch.classname(), patch.version());
        let mut patches = write_lock(&self.patches);

        if patches.contains_key(&key) && self.policy == DuplicatePolicy::Reject {
            return Err(PatchError::DuplicateRegistration {
                kind: "semantic patch",
                key: format!("{}/{}", self.context, key),
            });
        }

        tracing::debug!(context = %self.context, patch = %key, "registered semantic patch");
        patches.insert(key, patch);
        Ok(())
    }

    pub fn get_patch(&self, classname: &str, version: &str) -> Option<Arc<dyn SemanticPatch>> {
        read_lock(&self.patches)
            .get(&VersionId::new(classname, version))
            .cloned()
    }

    pub fn len(&self) -> usize {
        read_lock(&self.patches).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One [`SemanticPatchDb`] per context name
#[derive(Default)]
pub struct SemanticPatchRegistry {
    policy: DuplicatePolicy,
    contexts: RwLock<HashMap<String, Arc<SemanticPatchDb>>>,
}

impl SemanticPatchRegistry {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// The registry of `context`, if any patch was registered for it
    pub fn db(&self, context: &str) -> Option<Arc<SemanticPatchDb>> {
        read_lock(&self.contexts).get(context).cloned()
    }

    /// The registry of `context`, created on first use
    pub fn db_or_insert(&self, context: &str) -> Arc<SemanticPatchDb> {
        if let Some(db) = self.db(context) {
            return db;
        }

        write_lock(&self.contexts)
            .entry(context.to_string())
            .or_insert_with(|| Arc::new(SemanticPatchDb::new(context, self.policy)))
            .clone()
    }

    pub fn register_patch(&self, context: &str, patch: Arc<dyn SemanticPatch>) -> Result<()> {
        self.db_or_insert(context).register_patch(patch)
    }

    pub fn get_patch(
        &self,
        context: &str,
        classname: &str,
        version: &str,
    ) -> Option<Arc<dyn SemanticPatch>> {
        self.db(context)?.get_patch(classname, version)
    }

    /// Context names, sorted
    pub fn contexts(&self) -> Vec<String> {
        let mut names: Vec<_> = read_lock(&self.contexts).keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::FnSemanticPatch;

    fn noop(classname: &str, version: &str) -> Arc<dyn SemanticPatch> {
        Arc::new(FnSemanticPatch::new(classname, version, |_, _, _| {}))
    }

    #[test]
    fn test_scoped_by_context() {
        let registry = SemanticPatchRegistry::default();
        registry.register_patch("MedicalData", noop("Composite", "1")).unwrap();

        assert!(registry.get_patch("MedicalData", "Composite", "1").is_some());
        assert!(registry.get_patch("Other", "Composite", "1").is_none());
        assert!(registry.get_patch("MedicalData", "Composite", "2").is_none());
        assert_eq!(registry.contexts(), vec!["MedicalData".to_string()]);
    }

    #[test]
    fn test_duplicate_in_same_context() {
        let registry = SemanticPatchRegistry::new(DuplicatePolicy::Reject);
        registry.register_patch("A", noop("Composite", "1")).unwrap();
        registry.register_patch("B", noop("Composite", "1")).unwrap();

        let err = registry.register_patch("A", noop("Composite", "1")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Duplicate semantic patch registration: A/Composite@1"
        );
    }
}
