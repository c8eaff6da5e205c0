//! Atom Data Model
//!
//! The loosely-typed object graph produced by a reader and migrated by the
//! patching manager. Objects live in an [`AtomGraph`] arena and refer to each
//! other through [`ObjectId`] handles, so shared sub-objects and cycles are
//! plain handle copies with no ownership cycle.
//!
//! Only objects carry identity. Sequences, maps and scalars are owned values
//! inside an object's attributes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::version::{VersionId, CLASSNAME_KEY, VERSION_KEY};

/// Handle to an object stored in an [`AtomGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Raw arena slot
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of an atom value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomKind {
    Object,
    Sequence,
    Map,
    String,
    Numeric,
    Boolean,
    Blob,
}

/// A single atom value
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Object(ObjectId),
    Sequence(Vec<Atom>),
    Map(BTreeMap<String, Atom>),
    String(String),
    Numeric(f64),
    Boolean(bool),
    Blob(Vec<u8>),
}

impl Atom {
    pub fn string(value: impl Into<String>) -> Self {
        Atom::String(value.into())
    }

    pub fn kind(&self) -> AtomKind {
        match self {
            Atom::Object(_) => AtomKind::Object,
            Atom::Sequence(_) => AtomKind::Sequence,
            Atom::Map(_) => AtomKind::Map,
            Atom::String(_) => AtomKind::String,
            Atom::Numeric(_) => AtomKind::Numeric,
            Atom::Boolean(_) => AtomKind::Boolean,
            Atom::Blob(_) => AtomKind::Blob,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Atom::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atom::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Atom]> {
        match self {
            Atom::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Atom>> {
        match self {
            Atom::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Objects referenced by this value, in attribute order. Sequences and
    /// maps are searched recursively; referenced objects are not entered.
    pub fn object_refs(&self) -> Vec<ObjectId> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs(&self, refs: &mut Vec<ObjectId>) {
        match self {
            Atom::Object(id) => refs.push(*id),
            Atom::Sequence(items) => items.iter().for_each(|item| item.collect_refs(refs)),
            Atom::Map(entries) => entries.values().for_each(|value| value.collect_refs(refs)),
            _ => {}
        }
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::String(value.to_string())
    }
}

impl From<String> for Atom {
    fn from(value: String) -> Self {
        Atom::String(value)
    }
}

impl From<f64> for Atom {
    fn from(value: f64) -> Self {
        Atom::Numeric(value)
    }
}

impl From<bool> for Atom {
    fn from(value: bool) -> Self {
        Atom::Boolean(value)
    }
}

impl From<ObjectId> for Atom {
    fn from(value: ObjectId) -> Self {
        Atom::Object(value)
    }
}

/// An atom object: string metadata plus named attributes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomObject {
    pub meta: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, Atom>,
}

impl AtomObject {
    /// Create an object tagged with a classname and version
    pub fn new(classname: impl Into<String>, version: impl Into<String>) -> Self {
        let mut object = Self::default();
        object.meta.insert(CLASSNAME_KEY.to_string(), classname.into());
        object.meta.insert(VERSION_KEY.to_string(), version.into());
        object
    }

    pub fn classname(&self) -> Option<&str> {
        self.meta_info(CLASSNAME_KEY)
    }

    pub fn version(&self) -> Option<&str> {
        self.meta_info(VERSION_KEY)
    }

    /// The object's (classname, version), if both are present
    pub fn version_id(&self) -> Option<VersionId> {
        Some(VersionId::new(self.classname()?, self.version()?))
    }

    pub fn meta_info(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(|s| s.as_str())
    }

    pub fn set_meta_info(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.meta.insert(key.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&Atom> {
        self.attributes.get(name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Atom> {
        self.attributes.get_mut(name)
    }

    /// Set an attribute, returning the previous value
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Atom) -> Option<Atom> {
        self.attributes.insert(name.into(), value)
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Atom> {
        self.attributes.remove(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(|k| k.as_str())
    }

    /// Objects directly referenced by this object's attributes
    pub fn object_refs(&self) -> Vec<ObjectId> {
        let mut refs = Vec::new();
        for value in self.attributes.values() {
            value.collect_refs(&mut refs);
        }
        refs
    }

    /// Human-readable label used in logs and errors
    pub fn label(&self) -> String {
        format!(
            "{}@{}",
            self.classname().unwrap_or("<unknown>"),
            self.version().unwrap_or("?")
        )
    }
}

/// Arena owning every atom object of one graph
#[derive(Debug, Clone, Default)]
pub struct AtomGraph {
    objects: Vec<Option<AtomObject>>,
}

impl AtomGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object and return its handle
    pub fn insert(&mut self, object: AtomObject) -> ObjectId {
        self.objects.push(Some(object));
        ObjectId(self.objects.len() - 1)
    }

    pub fn get(&self, id: ObjectId) -> Option<&AtomObject> {
        self.objects.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut AtomObject> {
        self.objects.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    /// Remove an object. Handles to it become dangling and are never reused.
    pub fn remove(&mut self, id: ObjectId) -> Option<AtomObject> {
        self.objects.get_mut(id.0).and_then(|slot| slot.take())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of all live objects, in insertion order
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(idx, _)| ObjectId(idx))
    }
}

impl Index<ObjectId> for AtomGraph {
    type Output = AtomObject;

    fn index(&self, id: ObjectId) -> &AtomObject {
        match self.get(id) {
            Some(object) => object,
            None => panic!("atom object {} is not in the graph", id),
        }
    }
}

impl IndexMut<ObjectId> for AtomGraph {
    fn index_mut(&mut self, id: ObjectId) -> &mut AtomObject {
        match self.get_mut(id) {
            Some(object) => object,
            None => panic!("atom object {} is not in the graph", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_metadata() {
        let object = AtomObject::new("Widget", "1");
        assert_eq!(object.classname(), Some("Widget"));
        assert_eq!(object.version(), Some("1"));
        assert_eq!(object.version_id(), Some(VersionId::new("Widget", "1")));
        assert_eq!(AtomObject::default().version_id(), None);
    }

    #[test]
    fn test_object_refs_through_containers() {
        let mut graph = AtomGraph::new();
        let a = graph.insert(AtomObject::new("A", "1"));
        let b = graph.insert(AtomObject::new("B", "1"));
        let c = graph.insert(AtomObject::new("C", "1"));

        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Atom::Object(c));

        let mut root = AtomObject::new("Root", "1");
        root.set_attribute("list", Atom::Sequence(vec![Atom::Object(a), Atom::string("x")]));
        root.set_attribute("map", Atom::Map(map));
        root.set_attribute("single", Atom::Object(b));

        assert_eq!(root.object_refs(), vec![a, c, b]);
    }

    #[test]
    fn test_remove_leaves_dangling_handle() {
        let mut graph = AtomGraph::new();
        let a = graph.insert(AtomObject::new("A", "1"));
        let b = graph.insert(AtomObject::new("B", "1"));
        assert_eq!(graph.len(), 2);

        assert!(graph.remove(a).is_some());
        assert!(!graph.contains(a));
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    #[should_panic(expected = "is not in the graph")]
    fn test_index_dangling_panics() {
        let mut graph = AtomGraph::new();
        let a = graph.insert(AtomObject::new("A", "1"));
        graph.remove(a);
        let _ = &graph[a];
    }
}
