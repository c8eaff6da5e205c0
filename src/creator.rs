//! Creators described as data
//!
//! Most creators only set a handful of default values, so instead of a type
//! per class they are declared with [`DefaultCreator`], either in code or in
//! the `[[creators]]` section of the engine configuration.

use std::collections::BTreeMap;

use crate::atom::{Atom, AtomGraph, AtomObject, ObjectId};
use crate::config::CreatorConfig;
use crate::helper::{clean_fields, generate_id};
use crate::patch::Creator;
use crate::registry::StructuralCreatorDb;
use crate::version::VersionId;

/// A creator built from default values
///
/// Created objects carry `classname`, `version`, a fresh `id` and an empty
/// `fields` map, then the declared attributes. Nested objects are built
/// through the creator registry, so their own creators must be registered.
#[derive(Debug, Clone)]
pub struct DefaultCreator {
    classname: String,
    version: String,
    attributes: BTreeMap<String, Atom>,
    objects: BTreeMap<String, VersionId>,
}

impl DefaultCreator {
    pub fn new(classname: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            version: version.into(),
            attributes: BTreeMap::new(),
            objects: BTreeMap::new(),
        }
    }

    /// Build a creator from a `[[creators]]` entry
    pub fn from_config(config: &CreatorConfig) -> Self {
        let mut creator = Self::new(&config.classname, &config.version);
        for (name, value) in &config.attributes {
            creator.attributes.insert(name.clone(), value.to_atom());
        }
        creator
    }

    /// Set a default attribute value
    ///
    /// # Panics
    ///
    /// Panics if `value` is an object reference; handles only make sense in
    /// the graph they come from. Use [`with_object`](Self::with_object).
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Atom>) -> Self {
        let name = name.into();
        let value = value.into();
        if !value.object_refs().is_empty() {
            panic!("default value of '{}' holds an object reference", name);
        }
        self.objects.remove(&name);
        self.attributes.insert(name, value);
        self
    }

    /// Set an attribute to a new object of `classname`@`version`
    pub fn with_object(
        mut self,
        name: impl Into<String>,
        classname: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.attributes.remove(&name);
        self.objects.insert(name, VersionId::new(classname, version));
        self
    }

    pub fn attributes(&self) -> &BTreeMap<String, Atom> {
        &self.attributes
    }
}

impl Creator for DefaultCreator {
    fn classname(&self) -> &str {
        &self.classname
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn create(&self, graph: &mut AtomGraph, creators: &StructuralCreatorDb) -> ObjectId {
        let id = graph.insert(AtomObject::new(&self.classname, &self.version));
        generate_id(graph, id);
        clean_fields(graph, id);

        for (name, value) in &self.attributes {
            graph[id].set_attribute(name.clone(), value.clone());
        }
        for (name, nested) in &self.objects {
            let child = creators.create(graph, &nested.classname, &nested.version);
            graph[id].set_attribute(name.clone(), Atom::Object(child));
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DefaultValue, DuplicatePolicy};
    use crate::helper::functions::FIELDS_ATTRIBUTE;
    use crate::version::ID_KEY;
    use std::sync::Arc;

    #[test]
    fn test_create_with_defaults() {
        let creators = StructuralCreatorDb::default();
        let creator = DefaultCreator::new("Widget", "2").with_attribute("color", "white");

        let mut graph = AtomGraph::new();
        let id = creator.create(&mut graph, &creators);
        let object = &graph[id];
        assert_eq!(object.classname(), Some("Widget"));
        assert_eq!(object.version(), Some("2"));
        assert!(object.meta_info(ID_KEY).is_some());
        assert_eq!(object.attribute("color"), Some(&Atom::string("white")));
        assert_eq!(object.attribute(FIELDS_ATTRIBUTE), Some(&Atom::Map(BTreeMap::new())));
    }

    #[test]
    fn test_nested_objects_use_registry() {
        let creators = StructuralCreatorDb::new(DuplicatePolicy::Reject);
        creators
            .register_creator(Arc::new(DefaultCreator::new("Color", "1").with_attribute("rgb", "fff")))
            .unwrap();
        creators
            .register_creator(Arc::new(
                DefaultCreator::new("Widget", "3").with_object("color", "Color", "1"),
            ))
            .unwrap();

        let mut graph = AtomGraph::new();
        let id = creators.create(&mut graph, "Widget", "3");
        let color = graph[id].attribute("color").and_then(Atom::as_object).unwrap();
        assert_eq!(graph[color].classname(), Some("Color"));
        assert_eq!(graph[color].attribute("rgb"), Some(&Atom::string("fff")));
        assert_ne!(graph[id].meta_info(ID_KEY), graph[color].meta_info(ID_KEY));
    }

    #[test]
    fn test_from_config() {
        let mut attributes = BTreeMap::new();
        attributes.insert("color".to_string(), DefaultValue::String("white".into()));
        let config = CreatorConfig {
            classname: "Widget".into(),
            version: "2".into(),
            attributes,
        };

        let creator = DefaultCreator::from_config(&config);
        assert_eq!(creator.id(), VersionId::new("Widget", "2"));
        assert_eq!(creator.attributes()["color"], Atom::string("white"));
    }

    #[test]
    #[should_panic(expected = "holds an object reference")]
    fn test_object_default_panics() {
        let mut graph = AtomGraph::new();
        let other = graph.insert(AtomObject::new("Color", "1"));
        let _ = DefaultCreator::new("Widget", "2").with_attribute("color", Atom::Object(other));
    }
}
