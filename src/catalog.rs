//! Patch Catalog
//!
//! The one registry object a program builds at start-up: the versions
//! manager plus the creator, structural patch and semantic patch registries.
//! Patching managers borrow it immutably, so a fully built catalog can be
//! shared between threads.

use std::sync::Arc;

use crate::config::{DuplicatePolicy, EngineConfig};
use crate::creator::DefaultCreator;
use crate::error::Result;
use crate::patch::{Creator, SemanticPatch, StructuralPatch};
use crate::registry::{SemanticPatchRegistry, StructuralCreatorDb, StructuralPatchDb};
use crate::version::PatchKey;
use crate::versions::VersionsManager;

/// A group of creators and patches registered together
pub trait PatchModule {
    fn name(&self) -> &str;

    fn register(&self, catalog: &Catalog) -> Result<()>;
}

/// Every registry the patching engine reads from
pub struct Catalog {
    policy: DuplicatePolicy,
    versions: VersionsManager,
    creators: StructuralCreatorDb,
    structural: StructuralPatchDb,
    semantic: SemanticPatchRegistry,
    default_context: Option<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl Catalog {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            versions: VersionsManager::new(),
            creators: StructuralCreatorDb::new(policy),
            structural: StructuralPatchDb::new(policy),
            semantic: SemanticPatchRegistry::new(policy),
            default_context: None,
        }
    }

    /// Build the version graph, the link tables and the configured creators
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut catalog = Self::new(config.engine.duplicate_policy());
        catalog.default_context = config.engine.default_context.clone();

        catalog.versions.build_version_table(&config.classes)?;
        catalog.versions.build_link_table(&config.contexts)?;
        for creator in &config.creators {
            catalog.register_creator(Arc::new(DefaultCreator::from_config(creator)))?;
        }

        tracing::info!(
            classes = config.classes.len(),
            contexts = config.contexts.len(),
            creators = config.creators.len(),
            "catalog built from configuration"
        );
        Ok(catalog)
    }

    pub fn register_creator(&self, creator: Arc<dyn Creator>) -> Result<()> {
        self.creators.register_creator(creator)
    }

    /// Register a structural patch and add its edge to the version graph
    pub fn register_structural_patch(&self, patch: Arc<dyn StructuralPatch>) -> Result<()> {
        let key = patch.key();
        self.structural.register_patch(patch)?;
        self.versions.register_edge(&key);
        Ok(())
    }

    pub fn register_semantic_patch(&self, context: &str, patch: Arc<dyn SemanticPatch>) -> Result<()> {
        self.semantic.register_patch(context, patch)
    }

    /// Let a module register its creators and patches
    pub fn install(&self, module: &dyn PatchModule) -> Result<()> {
        tracing::debug!(module = module.name(), "installing patch module");
        module.register(self)
    }

    /// Graph edges that no structural patch implements.
    ///
    /// A migration crossing one of these edges would panic, so programs call
    /// this once after registration.
    pub fn verify(&self) -> Vec<PatchKey> {
        let missing: Vec<PatchKey> = self
            .versions
            .graph()
            .edges()
            .into_iter()
            .filter(|key| !self.structural.contains(key))
            .collect();

        for key in &missing {
            tracing::warn!(edge = %key, "no structural patch registered for edge");
        }
        missing
    }

    pub fn versions(&self) -> &VersionsManager {
        &self.versions
    }

    pub fn creators(&self) -> &StructuralCreatorDb {
        &self.creators
    }

    pub fn structural_patches(&self) -> &StructuralPatchDb {
        &self.structural
    }

    pub fn semantic_patches(&self) -> &SemanticPatchRegistry {
        &self.semantic
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Context used when a migration names none
    pub fn default_context(&self) -> Option<&str> {
        self.default_context.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::error::PatchError;
    use crate::patch::{FnSemanticPatch, FnStructuralPatch};
    use crate::version::VersionId;

    const CONFIG: &str = r#"
[engine]
default_context = "MedicalData"

[[classes]]
classname = "Widget"
versions = ["1", "2", "3"]

[[creators]]
classname = "Widget"
version = "1"
attributes = { color = "white" }
"#;

    fn step(from: &str, to: &str) -> Arc<dyn StructuralPatch> {
        Arc::new(FnStructuralPatch::new(
            VersionId::new("Widget", from),
            VersionId::new("Widget", to),
            |_, _, _| {},
        ))
    }

    struct WidgetModule;

    impl PatchModule for WidgetModule {
        fn name(&self) -> &str {
            "widget"
        }

        fn register(&self, catalog: &Catalog) -> Result<()> {
            catalog.register_structural_patch(step("1", "2"))?;
            catalog.register_semantic_patch(
                "MedicalData",
                Arc::new(FnSemanticPatch::new("Widget", "2", |_, current, ctx| {
                    ctx.helper(current).add_or_replace_attribute("checked", Atom::Boolean(true));
                })),
            )
        }
    }

    #[test]
    fn test_from_config() {
        let config = EngineConfig::from_toml_str(CONFIG).unwrap();
        let catalog = Catalog::from_config(&config).unwrap();

        assert_eq!(catalog.default_context(), Some("MedicalData"));
        assert!(catalog.creators().contains("Widget", "1"));
        assert_eq!(catalog.versions().graph().edge_count(), 2);
    }

    #[test]
    fn test_verify_reports_missing_patches() {
        let config = EngineConfig::from_toml_str(CONFIG).unwrap();
        let catalog = Catalog::from_config(&config).unwrap();
        catalog.install(&WidgetModule).unwrap();

        let missing = catalog.verify();
        assert_eq!(
            missing,
            vec![PatchKey::new(VersionId::new("Widget", "2"), VersionId::new("Widget", "3"))]
        );
        assert!(catalog.semantic_patches().get_patch("MedicalData", "Widget", "2").is_some());
    }

    #[test]
    fn test_structural_patch_adds_edge() {
        let catalog = Catalog::default();
        catalog.register_structural_patch(step("5", "6")).unwrap();

        assert!(catalog
            .versions()
            .contains(&VersionId::new("Widget", "6")));
        assert!(catalog.verify().is_empty());
    }

    #[test]
    fn test_duplicate_patch_rejected() {
        let catalog = Catalog::new(DuplicatePolicy::Reject);
        catalog.register_structural_patch(step("1", "2")).unwrap();
        let err = catalog.register_structural_patch(step("1", "2")).unwrap_err();
        assert!(matches!(err, PatchError::DuplicateRegistration { .. }));
        assert_eq!(catalog.duplicate_policy(), DuplicatePolicy::Reject);
    }
}
