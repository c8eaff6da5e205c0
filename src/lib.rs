//! Atom Patch
//!
//! A versioning and patching engine for graphs of typed atom objects. Every
//! object carries a classname and a structural version; when a graph written
//! by an older release is loaded, the engine migrates each object along the
//! shortest chain of registered structural patches, then applies the
//! context's semantic patches.
//!
//! ## Features
//!
//! - **Version Graph**: every known (classname, version) pair and the patches
//!   between them, with breadth-first path search
//! - **Context Link Tables**: named context versions mapping each class to a
//!   structural version
//! - **Registries**: creators, structural patches and per-context semantic
//!   patches, registered once at start-up in a [`Catalog`]
//! - **Patching Manager**: cycle-safe, single-visit migration of a whole graph
//! - **Patch Helpers**: checked attribute mutators, path lookup and graph
//!   comparison for patch authors
//!
//! ## Architecture
//!
//! ```text
//! EngineConfig ──> Catalog ─┬─ VersionsManager (VersionGraph + link tables)
//!                           ├─ StructuralCreatorDb
//!                           ├─ StructuralPatchDb
//!                           └─ SemanticPatchRegistry ─> SemanticPatchDb per context
//!
//! PatchingManager(&Catalog, &mut AtomGraph, root).transform_to("3")
//! ```

pub mod atom;
pub mod catalog;
pub mod config;
pub mod creator;
pub mod error;
pub mod graph;
pub mod helper;
pub mod manager;
pub mod patch;
pub mod registry;
pub mod version;
pub mod versions;

pub use atom::{Atom, AtomGraph, AtomKind, AtomObject, ObjectId};
pub use catalog::{Catalog, PatchModule};
pub use config::{DuplicatePolicy, EngineConfig};
pub use creator::DefaultCreator;
pub use error::{PatchError, Result};
pub use graph::VersionGraph;
pub use helper::ObjectHelper;
pub use manager::{MigrationReport, MigrationTarget, PatchingManager};
pub use patch::{
    Creator, FnSemanticPatch, FnStructuralPatch, NewVersions, PatchContext, RenamePatch,
    SemanticPatch, StructuralPatch,
};
pub use version::{PatchKey, VersionId};
pub use versions::{ContextVersion, VersionsManager};
