//! Metadata helpers

use std::collections::{BTreeMap, HashSet};

use crate::atom::{Atom, AtomGraph, ObjectId};
use crate::version::{CLASSNAME_KEY, ID_KEY, VERSION_KEY};

/// Attribute holding an object's free-form field map
pub const FIELDS_ATTRIBUTE: &str = "fields";

pub fn classname(graph: &AtomGraph, id: ObjectId) -> Option<&str> {
    graph.get(id)?.classname()
}

pub fn version(graph: &AtomGraph, id: ObjectId) -> Option<&str> {
    graph.get(id)?.version()
}

pub fn set_classname(graph: &mut AtomGraph, id: ObjectId, classname: &str) {
    graph[id].set_meta_info(CLASSNAME_KEY, classname);
}

pub fn set_version(graph: &mut AtomGraph, id: ObjectId, version: &str) {
    graph[id].set_meta_info(VERSION_KEY, version);
}

/// Give the object a fresh unique id and return it
pub fn generate_id(graph: &mut AtomGraph, id: ObjectId) -> String {
    let uid = uuid::Uuid::new_v4().to_string();
    graph[id].set_meta_info(ID_KEY, uid.clone());
    uid
}

/// Give fresh ids to `root` and every object reachable from it.
///
/// Used after cloning a sub-graph so the copy does not share ids with its
/// source. Shared and cyclic references are handled once.
pub fn change_uid(graph: &mut AtomGraph, root: ObjectId) {
    let mut visited = HashSet::new();
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) || !graph.contains(id) {
            continue;
        }
        generate_id(graph, id);
        stack.extend(graph[id].object_refs());
    }
}

/// Reset the object's `fields` attribute to an empty map
pub fn clean_fields(graph: &mut AtomGraph, id: ObjectId) {
    graph[id].set_attribute(FIELDS_ATTRIBUTE, Atom::Map(BTreeMap::new()));
}
