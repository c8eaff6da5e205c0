//! Attribute mutators for one atom object
//!
//! Every check failure here can only come from an incorrectly written patch
//! body, so it panics with the object and attribute involved.

use crate::atom::{Atom, AtomGraph, AtomObject, ObjectId};

/// Attribute helper bound to one object of a graph
pub struct ObjectHelper<'g> {
    graph: &'g mut AtomGraph,
    id: ObjectId,
}

impl<'g> ObjectHelper<'g> {
    pub fn new(graph: &'g mut AtomGraph, id: ObjectId) -> Self {
        Self { graph, id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn object(&self) -> &AtomObject {
        &self.graph[self.id]
    }

    pub fn attribute(&self, name: &str) -> Option<&Atom> {
        self.object().attribute(name)
    }

    /// Add a new attribute.
    ///
    /// # Panics
    ///
    /// Panics if the attribute already exists.
    pub fn add_attribute(&mut self, name: &str, value: Atom) -> &mut Self {
        let object = &mut self.graph[self.id];
        if object.has_attribute(name) {
            panic!("attribute '{}' already exists in {}", name, object.label());
        }

        tracing::debug!(object = %object.label(), attribute = name, "add attribute");
        object.set_attribute(name, value);
        self
    }

    /// Remove an attribute and return its value.
    ///
    /// # Panics
    ///
    /// Panics if the attribute does not exist.
    pub fn remove_attribute(&mut self, name: &str) -> Atom {
        let object = &mut self.graph[self.id];
        let label = object.label();
        match object.remove_attribute(name) {
            Some(value) => {
                tracing::debug!(object = %label, attribute = name, "remove attribute");
                value
            }
            None => panic!("attribute '{}' does not exist in {}", name, label),
        }
    }

    /// Rename an attribute, keeping its value.
    ///
    /// # Panics
    ///
    /// Panics if `old_name` does not exist or `new_name` already exists.
    pub fn rename_attribute(&mut self, old_name: &str, new_name: &str) -> &mut Self {
        let object = &mut self.graph[self.id];
        let label = object.label();
        if object.has_attribute(new_name) {
            panic!("attribute '{}' already exists in {}", new_name, label);
        }
        let Some(value) = object.remove_attribute(old_name) else {
            panic!("attribute '{}' does not exist in {}", old_name, label);
        };

        tracing::debug!(object = %label, from = old_name, to = new_name, "rename attribute");
        object.set_attribute(new_name, value);
        self
    }

    /// Replace the value of an existing attribute, returning the old one.
    ///
    /// # Panics
    ///
    /// Panics if the attribute does not exist.
    pub fn replace_attribute(&mut self, name: &str, value: Atom) -> Atom {
        let object = &mut self.graph[self.id];
        let label = object.label();
        match object.attribute_mut(name) {
            Some(slot) => {
                tracing::debug!(object = %label, attribute = name, "replace attribute");
                std::mem::replace(slot, value)
            }
            None => panic!("attribute '{}' does not exist in {}", name, label),
        }
    }

    /// Set an attribute whether or not it exists
    pub fn add_or_replace_attribute(&mut self, name: &str, value: Atom) -> Option<Atom> {
        let object = &mut self.graph[self.id];
        tracing::debug!(object = %object.label(), attribute = name, "add or replace attribute");
        object.set_attribute(name, value)
    }
}
