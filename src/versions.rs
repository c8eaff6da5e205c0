//! Versions Manager
//!
//! Owns the version graph and the per-context link tables. A link table maps
//! each named context version (e.g. `MedicalData/V2`) to the structural
//! version of every class it uses.
//!
//! Both tables are filled once from configuration at start-up and read
//! concurrently afterwards. The graph lock is always taken before the link
//! table lock.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use serde::Serialize;

use crate::config::{ClassVersions, ContextConfig};
use crate::error::{PatchError, Result};
use crate::graph::VersionGraph;
use crate::registry::{read_lock, write_lock};
use crate::version::{PatchKey, VersionId};

/// One named version of a context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextVersion {
    pub context: String,
    pub name: String,
    /// classname -> structural version
    pub classes: BTreeMap<String, VersionId>,
}

impl ContextVersion {
    /// Structural version of `classname` in this context version
    pub fn structural_version(&self, classname: &str) -> Option<&VersionId> {
        self.classes.get(classname)
    }

    /// Whether `id` is exactly the version this context version uses for its class
    pub fn uses(&self, id: &VersionId) -> bool {
        self.classes.get(&id.classname) == Some(id)
    }
}

/// Context name -> context versions, oldest first
type LinkTable = BTreeMap<String, Vec<ContextVersion>>;

/// Version graph plus link tables
#[derive(Debug, Default)]
pub struct VersionsManager {
    graph: RwLock<VersionGraph>,
    links: RwLock<LinkTable>,
}

impl VersionsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every listed version as a node and link consecutive versions of a
    /// class with an edge.
    pub fn build_version_table(&self, classes: &[ClassVersions]) -> Result<()> {
        for class in classes {
            validate_class(class)?;
        }

        let mut graph = write_lock(&self.graph);
        for class in classes {
            let ids: Vec<VersionId> = class
                .versions
                .iter()
                .map(|v| VersionId::new(&class.classname, v))
                .collect();
            for id in &ids {
                graph.add_node(id.clone());
            }
            for pair in ids.windows(2) {
                graph.add_edge(&PatchKey::new(pair[0].clone(), pair[1].clone()));
            }
            tracing::debug!(
                classname = %class.classname,
                versions = class.versions.len(),
                "registered class versions"
            );
        }
        Ok(())
    }

    /// Record context link tables and rename links.
    ///
    /// Every referenced structural version must already be a graph node, so
    /// the version table is built first. Nothing is recorded on error.
    pub fn build_link_table(&self, contexts: &[ContextConfig]) -> Result<()> {
        let mut graph = write_lock(&self.graph);
        let mut links = write_lock(&self.links);

        let mut pending: Vec<ContextVersion> = Vec::new();
        let mut renames: Vec<PatchKey> = Vec::new();
        let mut seen: HashSet<(String, String)> = links
            .values()
            .flatten()
            .map(|cv| (cv.context.clone(), cv.name.clone()))
            .collect();

        for context in contexts {
            if context.name.is_empty() {
                return Err(PatchError::InvalidConfig("context with empty name".to_string()));
            }

            for version in &context.versions {
                if !seen.insert((context.name.clone(), version.name.clone())) {
                    return Err(PatchError::InvalidConfig(format!(
                        "context version {}/{} declared twice",
                        context.name, version.name
                    )));
                }

                let mut classes = BTreeMap::new();
                for id in &version.classes {
                    ensure_known(&graph, id)?;
                    if classes.insert(id.classname.clone(), id.clone()).is_some() {
                        return Err(PatchError::InvalidConfig(format!(
                            "context version {}/{} lists {} twice",
                            context.name, version.name, id.classname
                        )));
                    }
                }
                pending.push(ContextVersion {
                    context: context.name.clone(),
                    name: version.name.clone(),
                    classes,
                });
            }

            for rename in &context.renames {
                ensure_known(&graph, &rename.from)?;
                ensure_known(&graph, &rename.to)?;
                renames.push(PatchKey::new(rename.from.clone(), rename.to.clone()));
            }
        }

        for key in renames {
            if graph.add_edge(&key) {
                tracing::debug!(link = %key, "registered rename link");
            }
        }
        for cv in pending {
            tracing::debug!(context = %cv.context, version = %cv.name, "registered context version");
            links.entry(cv.context.clone()).or_default().push(cv);
        }
        Ok(())
    }

    /// Add an edge, e.g. for a structural patch registered in code
    pub fn register_edge(&self, key: &PatchKey) -> bool {
        write_lock(&self.graph).add_edge(key)
    }

    pub fn contains(&self, id: &VersionId) -> bool {
        read_lock(&self.graph).contains(id)
    }

    pub fn compute_path(&self, origin: &VersionId, target: &VersionId) -> Result<Vec<PatchKey>> {
        read_lock(&self.graph).compute_path(origin, target)
    }

    pub fn compute_path_to<F>(&self, origin: &VersionId, is_target: F) -> Option<Vec<PatchKey>>
    where
        F: Fn(&VersionId) -> bool,
    {
        read_lock(&self.graph).compute_path_to(origin, is_target)
    }

    /// A copy of the current graph
    pub fn graph(&self) -> VersionGraph {
        read_lock(&self.graph).clone()
    }

    pub fn context_version(&self, context: &str, name: &str) -> Option<ContextVersion> {
        read_lock(&self.links)
            .get(context)?
            .iter()
            .find(|cv| cv.name == name)
            .cloned()
    }

    pub fn has_context_version(&self, context: &str, name: &str) -> bool {
        read_lock(&self.links)
            .get(context)
            .map(|versions| versions.iter().any(|cv| cv.name == name))
            .unwrap_or(false)
    }

    /// Structural version `classname` has in `context`/`name`
    pub fn structural_version(&self, context: &str, name: &str, classname: &str) -> Option<VersionId> {
        self.context_version(context, name)?
            .structural_version(classname)
            .cloned()
    }

    /// Every (context, version name) whose link table uses `id`
    pub fn context_versions_of(&self, id: &VersionId) -> Vec<(String, String)> {
        read_lock(&self.links)
            .values()
            .flatten()
            .filter(|cv| cv.uses(id))
            .map(|cv| (cv.context.clone(), cv.name.clone()))
            .collect()
    }

    /// Context names, sorted
    pub fn contexts(&self) -> Vec<String> {
        read_lock(&self.links).keys().cloned().collect()
    }

    /// Versions of one context, oldest first
    pub fn context_versions(&self, context: &str) -> Vec<ContextVersion> {
        read_lock(&self.links).get(context).cloned().unwrap_or_default()
    }
}

fn validate_class(class: &ClassVersions) -> Result<()> {
    if class.classname.is_empty() {
        return Err(PatchError::InvalidConfig("class with empty classname".to_string()));
    }
    if class.versions.is_empty() {
        return Err(PatchError::InvalidConfig(format!(
            "class {} lists no versions",
            class.classname
        )));
    }

    let mut seen = HashSet::new();
    for version in &class.versions {
        if version.is_empty() {
            return Err(PatchError::InvalidConfig(format!(
                "class {} has an empty version",
                class.classname
            )));
        }
        if !seen.insert(version) {
            return Err(PatchError::InvalidConfig(format!(
                "class {} lists version {} twice",
                class.classname, version
            )));
        }
    }
    Ok(())
}

fn ensure_known(graph: &VersionGraph, id: &VersionId) -> Result<()> {
    if graph.contains(id) {
        Ok(())
    } else {
        Err(PatchError::UnknownStructuralVersion {
            classname: id.classname.clone(),
            version: id.version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContextVersionConfig, RenameLink};

    fn class(classname: &str, versions: &[&str]) -> ClassVersions {
        ClassVersions {
            classname: classname.to_string(),
            versions: versions.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn medical() -> ContextConfig {
        ContextConfig {
            name: "MedicalData".to_string(),
            versions: vec![
                ContextVersionConfig {
                    name: "V1".to_string(),
                    classes: vec![VersionId::new("Patient", "1"), VersionId::new("Study", "1")],
                },
                ContextVersionConfig {
                    name: "V2".to_string(),
                    classes: vec![VersionId::new("MedPatient", "1"), VersionId::new("Study", "2")],
                },
            ],
            renames: vec![RenameLink {
                from: VersionId::new("Patient", "1"),
                to: VersionId::new("MedPatient", "1"),
            }],
        }
    }

    fn manager() -> VersionsManager {
        let manager = VersionsManager::new();
        manager
            .build_version_table(&[
                class("Patient", &["1"]),
                class("MedPatient", &["1"]),
                class("Study", &["1", "2"]),
            ])
            .unwrap();
        manager.build_link_table(&[medical()]).unwrap();
        manager
    }

    #[test]
    fn test_version_table_edges() {
        let manager = VersionsManager::new();
        manager.build_version_table(&[class("Widget", &["1", "2", "3"])]).unwrap();

        let path = manager
            .compute_path(&VersionId::new("Widget", "1"), &VersionId::new("Widget", "3"))
            .unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(manager.graph().edge_count(), 2);
    }

    #[test]
    fn test_invalid_class_tables() {
        let manager = VersionsManager::new();
        assert!(matches!(
            manager.build_version_table(&[class("Widget", &[])]),
            Err(PatchError::InvalidConfig(_))
        ));
        assert!(matches!(
            manager.build_version_table(&[class("Widget", &["1", "1"])]),
            Err(PatchError::InvalidConfig(_))
        ));
        assert!(matches!(
            manager.build_version_table(&[class("", &["1"])]),
            Err(PatchError::InvalidConfig(_))
        ));
        assert_eq!(manager.graph().node_count(), 0);
    }

    #[test]
    fn test_link_lookups() {
        let manager = manager();
        assert_eq!(manager.contexts(), vec!["MedicalData".to_string()]);
        assert!(manager.has_context_version("MedicalData", "V2"));
        assert!(!manager.has_context_version("MedicalData", "V3"));
        assert_eq!(
            manager.structural_version("MedicalData", "V2", "Study"),
            Some(VersionId::new("Study", "2"))
        );
        assert_eq!(
            manager.context_versions_of(&VersionId::new("Study", "1")),
            vec![("MedicalData".to_string(), "V1".to_string())]
        );
        assert_eq!(manager.context_versions("MedicalData").len(), 2);
    }

    #[test]
    fn test_rename_adds_edge() {
        let manager = manager();
        let v2 = manager.context_version("MedicalData", "V2").unwrap();
        let path = manager
            .compute_path_to(&VersionId::new("Patient", "1"), |id| v2.uses(id))
            .unwrap();
        assert_eq!(path.len(), 1);
        assert!(path[0].is_rename());
    }

    #[test]
    fn test_unknown_structural_version() {
        let manager = VersionsManager::new();
        manager.build_version_table(&[class("Patient", &["1"])]).unwrap();

        let err = manager.build_link_table(&[medical()]).unwrap_err();
        assert!(matches!(err, PatchError::UnknownStructuralVersion { .. }));
        assert!(manager.contexts().is_empty());
    }

    #[test]
    fn test_duplicate_context_version() {
        let manager = manager();
        let mut again = medical();
        again.renames.clear();
        again.versions.truncate(1);

        let err = manager.build_link_table(&[again]).unwrap_err();
        assert!(matches!(err, PatchError::InvalidConfig(_)));
    }
}
