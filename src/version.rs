//! Version identifiers
//!
//! A [`VersionId`] names one structural version of one class. A [`PatchKey`]
//! names a directed edge between two of them, i.e. one structural patch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata key holding an atom object's classname
pub const CLASSNAME_KEY: &str = "classname";
/// Metadata key holding an atom object's structural version
pub const VERSION_KEY: &str = "version";
/// Metadata key holding an atom object's unique id
pub const ID_KEY: &str = "id";
/// Root metadata key naming the context the graph was written in
pub const CONTEXT_KEY: &str = "context";
/// Root metadata key naming the context version the graph was written in
pub const VERSION_NAME_KEY: &str = "version_name";

/// A (classname, version) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionId {
    pub classname: String,
    pub version: String,
}

impl VersionId {
    pub fn new(classname: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.classname, self.version)
    }
}

/// A directed (origin, target) edge of the version graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatchKey {
    pub origin: VersionId,
    pub target: VersionId,
}

impl PatchKey {
    pub fn new(origin: VersionId, target: VersionId) -> Self {
        Self { origin, target }
    }

    /// Whether the patch changes the classname and not only the version
    pub fn is_rename(&self) -> bool {
        self.origin.classname != self.target.classname
    }
}

impl fmt::Display for PatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.target)
    }
}
