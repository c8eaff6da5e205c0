//! Patching Manager
//!
//! Migrates a whole atom graph, starting from a root object, to a target
//! version. Every reachable object is visited once, in pre-order, and walked
//! along its own shortest patch path:
//!
//! ```text
//! Widget@1 --(1->2)--> Widget@2 --semantic(ctx, Widget@2)--(2->3)--> Widget@3 --semantic(ctx, Widget@3)
//! ```
//!
//! Two kinds of target exist:
//!
//! - **structural**: a bare version string. Each object moves to the nearest
//!   reachable version with that name, possibly under a new classname.
//! - **context**: a named context version. Each object moves to the version
//!   the context's link table lists for it, one context version at a time, so
//!   the semantic patches of every version in between run in order.
//!
//! The graph is checked before anything is touched, so data errors leave it
//! unchanged. A path step with no registered structural patch is a
//! registration bug and panics.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::atom::{AtomGraph, AtomObject, ObjectId};
use crate::catalog::Catalog;
use crate::error::{PatchError, Result};
use crate::patch::{NewVersions, PatchContext};
use crate::version::{PatchKey, VersionId, CLASSNAME_KEY, CONTEXT_KEY, VERSION_KEY, VERSION_NAME_KEY};
use crate::versions::{ContextVersion, VersionsManager};

/// Where a migration goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationTarget {
    /// Every object to its nearest version named like this
    Structural(String),
    /// Every object to the version listed in the context's link table
    Context { context: String, version_name: String },
}

/// One patch applied to one object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedPatch {
    pub object: ObjectId,
    pub patch: String,
}

/// What the last migration did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationReport {
    /// Objects visited, created ones included
    pub visited: usize,
    pub structural: Vec<AppliedPatch>,
    pub semantic: Vec<AppliedPatch>,
    /// Objects created by patches
    pub created: Vec<ObjectId>,
    /// Objects with no path to a structural target, left untouched
    pub skipped: Vec<ObjectId>,
}

/// Target resolution for one migration
enum Resolver {
    Structural(String),
    Context(ContextVersion),
}

impl Resolver {
    fn is_target(&self, id: &VersionId) -> bool {
        match self {
            Resolver::Structural(version) => id.version == *version,
            Resolver::Context(cv) => cv.uses(id),
        }
    }

    /// Path from `origin` to its target; an origin already on target needs
    /// none, even when its class is not in the graph.
    fn resolve(&self, versions: &VersionsManager, origin: &VersionId) -> Option<Vec<PatchKey>> {
        if self.is_target(origin) {
            return Some(Vec::new());
        }
        versions.compute_path_to(origin, |id| self.is_target(id))
    }

    fn label(&self) -> String {
        match self {
            Resolver::Structural(version) => version.clone(),
            Resolver::Context(cv) => format!("{}/{}", cv.context, cv.name),
        }
    }
}

/// Migrates the graph reachable from one root object
pub struct PatchingManager<'a> {
    catalog: &'a Catalog,
    graph: &'a mut AtomGraph,
    root: ObjectId,
    context: Option<String>,
    report: MigrationReport,
}

impl<'a> PatchingManager<'a> {
    pub fn new(catalog: &'a Catalog, graph: &'a mut AtomGraph, root: ObjectId) -> Self {
        Self {
            catalog,
            graph,
            root,
            context: None,
            report: MigrationReport::default(),
        }
    }

    /// Apply the semantic patches of `context` during structural migrations
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// Report of the last migration
    pub fn report(&self) -> &MigrationReport {
        &self.report
    }

    /// Migrate to `new_version`.
    ///
    /// When the root was written in a context (`context` and `version_name`
    /// metadata) and `new_version` names a version of that context, the
    /// migration follows the context's link table. Otherwise `new_version`
    /// is a structural version.
    pub fn transform_to(&mut self, new_version: &str) -> Result<ObjectId> {
        let root = &self.graph[self.root];
        let target = match (root.meta_info(CONTEXT_KEY), root.meta_info(VERSION_NAME_KEY)) {
            (Some(context), Some(_))
                if self.catalog.versions().has_context_version(context, new_version) =>
            {
                MigrationTarget::Context {
                    context: context.to_string(),
                    version_name: new_version.to_string(),
                }
            }
            _ => MigrationTarget::Structural(new_version.to_string()),
        };
        self.transform_to_target(target)
    }

    pub fn transform_to_target(&mut self, target: MigrationTarget) -> Result<ObjectId> {
        self.report = MigrationReport::default();

        let (hops, semantic_context, version_changes) = match &target {
            MigrationTarget::Structural(version) => {
                (vec![Resolver::Structural(version.clone())], self.semantic_context(), false)
            }
            MigrationTarget::Context { context, version_name } => {
                let (hops, changes) = self.context_hops(context, version_name)?;
                (hops, Some(context.clone()), changes)
            }
        };
        let Some(last) = hops.last() else {
            return Ok(self.root);
        };

        tracing::info!(root = %self.root, to = %last.label(), hops = hops.len(), "starting migration");
        self.validate(&hops)?;
        self.migrate(&hops, semantic_context.as_deref(), version_changes)?;

        if let MigrationTarget::Context { context, version_name } = &target {
            let root = &mut self.graph[self.root];
            root.set_meta_info(CONTEXT_KEY, context.clone());
            root.set_meta_info(VERSION_NAME_KEY, version_name.clone());
        }

        tracing::info!(
            root = %self.root,
            visited = self.report.visited,
            structural = self.report.structural.len(),
            semantic = self.report.semantic.len(),
            created = self.report.created.len(),
            skipped = self.report.skipped.len(),
            "migration finished"
        );
        Ok(self.root)
    }

    /// Context versions to pass through, oldest first, and whether the
    /// context version changes at all.
    ///
    /// A root written in an older version of the same context walks every
    /// version after it up to the target. Any other root goes straight to
    /// the target.
    fn context_hops(&self, context: &str, version_name: &str) -> Result<(Vec<Resolver>, bool)> {
        let mut table = self.catalog.versions().context_versions(context);
        let Some(target) = table.iter().position(|cv| cv.name == version_name) else {
            return Err(PatchError::UnknownContextVersion {
                context: context.to_string(),
                version: version_name.to_string(),
            });
        };

        let root = &self.graph[self.root];
        let source = root
            .meta_info(VERSION_NAME_KEY)
            .filter(|_| root.meta_info(CONTEXT_KEY) == Some(context))
            .and_then(|name| table.iter().position(|cv| cv.name == name));

        let (range, changes) = match source {
            Some(source) if source == target => (target..target + 1, false),
            Some(source) if source < target => (source + 1..target + 1, true),
            _ => (target..target + 1, true),
        };
        let hops = table.drain(range).map(Resolver::Context).collect();
        Ok((hops, changes))
    }

    /// Explicit context, else the one the root was written in, else the
    /// catalog default
    fn semantic_context(&self) -> Option<String> {
        self.context
            .clone()
            .or_else(|| self.graph[self.root].meta_info(CONTEXT_KEY).map(String::from))
            .or_else(|| self.catalog.default_context().map(String::from))
    }

    /// Read-only pass: every reachable object must be versioned and resolve
    fn validate(&self, hops: &[Resolver]) -> Result<()> {
        let versions = self.catalog.versions();
        let mut visited = HashSet::new();
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(object) = self.graph.get(id) else {
                continue;
            };

            let origin = version_id(object, id)?;
            if plan(versions, hops, &origin).is_none() && (id == self.root || is_strict(hops)) {
                return Err(impossible(&origin, hops));
            }
            stack.extend(object.object_refs());
        }
        Ok(())
    }

    fn migrate(
        &mut self,
        hops: &[Resolver],
        context: Option<&str>,
        version_changes: bool,
    ) -> Result<()> {
        let catalog = self.catalog;
        let versions = catalog.versions();
        let mut migrated: HashMap<ObjectId, VersionId> = HashMap::new();
        let mut created: HashSet<ObjectId> = HashSet::new();
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            if migrated.contains_key(&id) {
                continue;
            }
            let Some(object) = self.graph.get(id) else {
                continue;
            };
            self.report.visited += 1;

            let origin = version_id(object, id)?;
            let Some(steps) = plan(versions, hops, &origin) else {
                if id == self.root || is_strict(hops) {
                    return Err(impossible(&origin, hops));
                }
                tracing::debug!(object = %id, version = %origin, "no path to target, left untouched");
                self.report.skipped.push(id);
                migrated.insert(id, origin);
                push_children(&mut stack, object);
                continue;
            };

            let resolved = steps
                .iter()
                .flatten()
                .filter_map(|path| path.last())
                .last()
                .map(|key| key.target.clone())
                .unwrap_or_else(|| origin.clone());
            migrated.insert(id, resolved.clone());
            let semantic = context.filter(|_| !created.contains(&id));
            let mut new_versions = NewVersions::default();
            let mut current = origin;
            let mut fixed_up: Option<VersionId> = None;

            for (hop, path) in hops.iter().zip(steps) {
                // A context version that does not list the class is passed over
                let Some(path) = path else {
                    continue;
                };
                let snapshot = self.graph[id].clone();

                for key in &path {
                    let Some(patch) = catalog.structural_patches().get(key) else {
                        panic!("no structural patch registered for {}", key);
                    };

                    let previous = self.graph[id].clone();
                    stamp(&mut self.graph[id], &key.target);

                    let mut ctx =
                        PatchContext::for_migration(&mut *self.graph, catalog.creators(), context, &migrated);
                    patch.apply(&previous, id, &mut ctx);
                    new_versions.extend(ctx.into_new_versions());

                    tracing::debug!(object = %id, patch = %key, "applied structural patch");
                    self.report.structural.push(AppliedPatch {
                        object: id,
                        patch: key.to_string(),
                    });
                    stamp(&mut self.graph[id], &key.target);

                    if let (Resolver::Structural(_), Some(context)) = (hop, semantic) {
                        self.apply_semantic(context, id, &key.target, &previous, &migrated, &mut new_versions);
                    }
                }

                if let Some(key) = path.last() {
                    current = key.target.clone();
                }
                // Each structural version gets its context patch at most once
                if let (Resolver::Context(_), Some(context)) = (hop, semantic) {
                    let changed = !path.is_empty() || version_changes;
                    if changed && fixed_up.as_ref() != Some(&current) {
                        self.apply_semantic(context, id, &current, &snapshot, &migrated, &mut new_versions);
                        fixed_up = Some(current.clone());
                    }
                }
            }

            stamp(&mut self.graph[id], &resolved);
            push_children(&mut stack, &self.graph[id]);

            for new_id in new_versions.into_vec() {
                if created.insert(new_id) {
                    self.report.created.push(new_id);
                }
                stack.push(new_id);
            }
        }
        Ok(())
    }

    /// Run the semantic patch of `context` for `version`, if one is registered
    fn apply_semantic(
        &mut self,
        context: &str,
        id: ObjectId,
        version: &VersionId,
        previous: &AtomObject,
        migrated: &HashMap<ObjectId, VersionId>,
        new_versions: &mut NewVersions,
    ) {
        let catalog = self.catalog;
        let Some(patch) = catalog
            .semantic_patches()
            .get_patch(context, &version.classname, &version.version)
        else {
            return;
        };

        let mut ctx =
            PatchContext::for_migration(&mut *self.graph, catalog.creators(), Some(context), migrated);
        patch.apply(previous, id, &mut ctx);
        new_versions.extend(ctx.into_new_versions());
        stamp(&mut self.graph[id], version);

        tracing::debug!(object = %id, context, version = %version, "applied semantic patch");
        self.report.semantic.push(AppliedPatch {
            object: id,
            patch: format!("{}/{}", context, version),
        });
    }
}

/// Per-hop patch paths from `origin`, or `None` when the last hop cannot be
/// reached. An intermediate hop that does not resolve is `None` in the list
/// and skipped.
fn plan(versions: &VersionsManager, hops: &[Resolver], origin: &VersionId) -> Option<Vec<Option<Vec<PatchKey>>>> {
    let (last, intermediate) = hops.split_last()?;
    let mut current = origin.clone();
    let mut steps = Vec::with_capacity(hops.len());

    for hop in intermediate {
        let path = hop.resolve(versions, &current);
        if let Some(key) = path.as_ref().and_then(|path| path.last()) {
            current = key.target.clone();
        }
        steps.push(path);
    }
    steps.push(Some(last.resolve(versions, &current)?));
    Some(steps)
}

/// Whether every object must reach a target, not just the root
fn is_strict(hops: &[Resolver]) -> bool {
    hops.iter().any(|hop| matches!(hop, Resolver::Context(_)))
}

/// Children are pushed in reverse so they pop in attribute order
fn push_children(stack: &mut Vec<ObjectId>, object: &AtomObject) {
    stack.extend(object.object_refs().into_iter().rev());
}

fn stamp(object: &mut AtomObject, id: &VersionId) {
    object.set_meta_info(CLASSNAME_KEY, id.classname.clone());
    object.set_meta_info(VERSION_KEY, id.version.clone());
}

fn version_id(object: &AtomObject, id: ObjectId) -> Result<VersionId> {
    let missing = |key: &str| PatchError::MissingInformation {
        object: id.to_string(),
        key: key.to_string(),
    };
    let classname = object.classname().ok_or_else(|| missing(CLASSNAME_KEY))?;
    let version = object.version().ok_or_else(|| missing(VERSION_KEY))?;
    Ok(VersionId::new(classname, version))
}

fn impossible(origin: &VersionId, hops: &[Resolver]) -> PatchError {
    PatchError::ImpossibleConversion {
        classname: origin.classname.clone(),
        from: origin.version.clone(),
        to: hops.last().map(Resolver::label).unwrap_or_default(),
    }
}
