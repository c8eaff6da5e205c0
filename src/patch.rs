//! Patch and creator abstractions
//!
//! Structural patches change an atom's shape (and possibly its classname)
//! from one structural version to the next. Semantic patches fix up field
//! values for a context without changing the shape. Creators build a default
//! atom of a given version from nothing.
//!
//! All three are stateless functors registered once in the
//! [`Catalog`](crate::catalog::Catalog) and shared across threads.
//!
//! A patch receives `previous`, a snapshot of the object before the step,
//! and `current`, the handle of the live object already stamped with the
//! target classname and version. It mutates `current` through the
//! [`PatchContext`].

use std::collections::HashMap;

use crate::atom::{AtomGraph, AtomObject, ObjectId};
use crate::helper::ObjectHelper;
use crate::registry::StructuralCreatorDb;
use crate::version::{PatchKey, VersionId};

/// Transforms an atom from `origin()` to `target()`
pub trait StructuralPatch: Send + Sync {
    fn origin(&self) -> &VersionId;

    fn target(&self) -> &VersionId;

    fn key(&self) -> PatchKey {
        PatchKey::new(self.origin().clone(), self.target().clone())
    }

    fn apply(&self, previous: &AtomObject, current: ObjectId, ctx: &mut PatchContext<'_>);
}

/// Fixes up an atom of `classname()`@`version()` within one context
pub trait SemanticPatch: Send + Sync {
    fn classname(&self) -> &str;

    fn version(&self) -> &str;

    fn apply(&self, previous: &AtomObject, current: ObjectId, ctx: &mut PatchContext<'_>);
}

/// Builds a minimal valid atom object of `classname()`@`version()`
pub trait Creator: Send + Sync {
    fn classname(&self) -> &str;

    fn version(&self) -> &str;

    fn id(&self) -> VersionId {
        VersionId::new(self.classname(), self.version())
    }

    /// Create the object in `graph`. Nested objects are built through
    /// `creators`.
    fn create(&self, graph: &mut AtomGraph, creators: &StructuralCreatorDb) -> ObjectId;
}

/// Objects created while patching one object
///
/// The patching manager migrates each of them in turn, so a creator may
/// return an object at an older version than the migration target.
#[derive(Debug, Clone, Default)]
pub struct NewVersions {
    created: Vec<ObjectId>,
}

impl NewVersions {
    pub fn push(&mut self, id: ObjectId) {
        if !self.created.contains(&id) {
            self.created.push(id);
        }
    }

    pub fn created(&self) -> &[ObjectId] {
        &self.created
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    pub fn into_vec(self) -> Vec<ObjectId> {
        self.created
    }

    /// Append `other`, keeping first-seen order
    pub fn extend(&mut self, other: NewVersions) {
        for id in other.created {
            self.push(id);
        }
    }
}

/// Everything a patch body may touch while it runs
pub struct PatchContext<'a> {
    graph: &'a mut AtomGraph,
    creators: &'a StructuralCreatorDb,
    context: Option<&'a str>,
    migrated: Option<&'a HashMap<ObjectId, VersionId>>,
    new_versions: NewVersions,
}

impl<'a> PatchContext<'a> {
    pub fn new(graph: &'a mut AtomGraph, creators: &'a StructuralCreatorDb) -> Self {
        Self {
            graph,
            creators,
            context: None,
            migrated: None,
            new_versions: NewVersions::default(),
        }
    }

    pub(crate) fn for_migration(
        graph: &'a mut AtomGraph,
        creators: &'a StructuralCreatorDb,
        context: Option<&'a str>,
        migrated: &'a HashMap<ObjectId, VersionId>,
    ) -> Self {
        Self {
            graph,
            creators,
            context,
            migrated: Some(migrated),
            new_versions: NewVersions::default(),
        }
    }

    pub fn graph(&self) -> &AtomGraph {
        &*self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AtomGraph {
        &mut *self.graph
    }

    pub fn object(&self, id: ObjectId) -> &AtomObject {
        &self.graph[id]
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut AtomObject {
        &mut self.graph[id]
    }

    /// Attribute helper bound to `id`
    pub fn helper(&mut self, id: ObjectId) -> ObjectHelper<'_> {
        ObjectHelper::new(&mut *self.graph, id)
    }

    /// Create a default object through the creator registry and queue it
    /// for migration.
    ///
    /// # Panics
    ///
    /// Panics if no creator is registered for `classname`@`version`.
    pub fn create(&mut self, classname: &str, version: &str) -> ObjectId {
        let id = self.creators.create(&mut *self.graph, classname, version);
        self.new_versions.push(id);
        id
    }

    /// Store a hand-built object and queue it for migration
    pub fn insert(&mut self, object: AtomObject) -> ObjectId {
        let id = self.graph.insert(object);
        self.new_versions.push(id);
        id
    }

    /// Queue an object built outside the context for migration
    pub fn register_new(&mut self, id: ObjectId) {
        self.new_versions.push(id);
    }

    /// Creator registry, e.g. to read the defaults of a version
    pub fn creators(&self) -> &StructuralCreatorDb {
        self.creators
    }

    /// Context of the running migration, if any
    pub fn context(&self) -> Option<&str> {
        self.context
    }

    /// Whether `id` has already been visited by the running migration
    pub fn is_migrated(&self, id: ObjectId) -> bool {
        self.migrated.map(|m| m.contains_key(&id)).unwrap_or(false)
    }

    pub fn new_versions(&self) -> &NewVersions {
        &self.new_versions
    }

    pub(crate) fn into_new_versions(self) -> NewVersions {
        self.new_versions
    }
}

/// A structural patch whose body is a closure
pub struct FnStructuralPatch<F> {
    origin: VersionId,
    target: VersionId,
    body: F,
}

impl<F> FnStructuralPatch<F>
where
    F: Fn(&AtomObject, ObjectId, &mut PatchContext<'_>) + Send + Sync,
{
    pub fn new(origin: VersionId, target: VersionId, body: F) -> Self {
        Self { origin, target, body }
    }
}

impl<F> StructuralPatch for FnStructuralPatch<F>
where
    F: Fn(&AtomObject, ObjectId, &mut PatchContext<'_>) + Send + Sync,
{
    fn origin(&self) -> &VersionId {
        &self.origin
    }

    fn target(&self) -> &VersionId {
        &self.target
    }

    fn apply(&self, previous: &AtomObject, current: ObjectId, ctx: &mut PatchContext<'_>) {
        (self.body)(previous, current, ctx)
    }
}

/// A structural patch that only changes classname and/or version.
///
/// Used for rename links whose attribute set is unchanged.
#[derive(Debug, Clone)]
pub struct RenamePatch {
    origin: VersionId,
    target: VersionId,
}

impl RenamePatch {
    pub fn new(origin: VersionId, target: VersionId) -> Self {
        Self { origin, target }
    }
}

impl StructuralPatch for RenamePatch {
    fn origin(&self) -> &VersionId {
        &self.origin
    }

    fn target(&self) -> &VersionId {
        &self.target
    }

    fn apply(&self, _previous: &AtomObject, _current: ObjectId, _ctx: &mut PatchContext<'_>) {}
}

/// A semantic patch whose body is a closure
pub struct FnSemanticPatch<F> {
    classname: String,
    version: String,
    body: F,
}

impl<F> FnSemanticPatch<F>
where
    F: Fn(&AtomObject, ObjectId, &mut PatchContext<'_>) + Send + Sync,
{
    pub fn new(classname: impl Into<String>, version: impl Into<String>, body: F) -> Self {
        Self {
            classname: classname.into(),
            version: version.into(),
            body,
        }
    }
}

impl<F> SemanticPatch for FnSemanticPatch<F>
where
    F: Fn(&AtomObject, ObjectId, &mut PatchContext<'_>) + Send + Sync,
{
    fn classname(&self) -> &str {
        &self.classname
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn apply(&self, previous: &AtomObject, current: ObjectId, ctx: &mut PatchContext<'_>) {
        (self.body)(previous, current, ctx)
    }
}
