//! Version Graph
//!
//! Directed graph of every known (classname, version) pair, stored in a
//! petgraph `DiGraph`. An edge `A -> B` means a structural patch migrates an
//! `A` atom into a `B` atom. Edges may change the classname as well as the
//! version (rename links).
//!
//! Path search lives in [`path`]. The graph itself is plain data; the
//! [`VersionsManager`](crate::versions::VersionsManager) owns it behind a lock.

pub mod path;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};

use crate::version::{PatchKey, VersionId};

/// The version graph
#[derive(Debug, Clone, Default)]
pub struct VersionGraph {
    /// Primary graph structure
    pub(crate) graph: DiGraph<VersionId, ()>,

    /// Node index lookup: VersionId -> NodeIndex
    pub(crate) node_indices: HashMap<VersionId, NodeIndex>,
}

impl VersionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning the existing index if already known
    pub fn add_node(&mut self, id: VersionId) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(&id) {
            return idx;
        }

        let idx = self.graph.add_node(id.clone());
        self.node_indices.insert(id, idx);
        idx
    }

    /// Add an edge, creating missing endpoints. Returns `false` when the edge
    /// was already present.
    pub fn add_edge(&mut self, key: &PatchKey) -> bool {
        let from = self.add_node(key.origin.clone());
        let to = self.add_node(key.target.clone());

        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    pub fn contains(&self, id: &VersionId) -> bool {
        self.node_indices.contains_key(id)
    }

    pub fn contains_edge(&self, key: &PatchKey) -> bool {
        match (self.node_indices.get(&key.origin), self.node_indices.get(&key.target)) {
            (Some(&from), Some(&to)) => self.graph.find_edge(from, to).is_some(),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All known classnames, sorted
    pub fn classnames(&self) -> Vec<&str> {
        self.graph
            .node_weights()
            .map(|id| id.classname.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Versions known for a classname, in registration order
    pub fn versions_of(&self, classname: &str) -> Vec<&str> {
        self.graph
            .node_weights()
            .filter(|id| id.classname == classname)
            .map(|id| id.version.as_str())
            .collect()
    }

    /// All edges, in registration order
    pub fn edges(&self) -> Vec<PatchKey> {
        self.graph
            .edge_references()
            .map(|e| PatchKey::new(self.graph[e.source()].clone(), self.graph[e.target()].clone()))
            .collect()
    }

    /// Outgoing edges of a node, oldest first.
    ///
    /// petgraph walks adjacency lists newest-first, so edges are re-sorted by
    /// index to keep path search tie-breaks on registration order.
    pub(crate) fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target()))
            .collect();
        edges.sort_by_key(|(edge, _)| *edge);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Export the version graph to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph VersionGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8];\n");
        output.push('\n');

        for classname in self.classnames() {
            let cluster = dot_id(classname);
            output.push_str(&format!("  subgraph \"cluster_{}\" {{\n", cluster));
            output.push_str(&format!("    label=\"{}\";\n", classname));
            for version in self.versions_of(classname) {
                let id = VersionId::new(classname, version);
                output.push_str(&format!(
                    "    \"{}\" [label=\"{}\"];\n",
                    dot_id(&id.to_string()),
                    version
                ));
            }
            output.push_str("  }\n");
        }

        output.push('\n');

        for key in self.edges() {
            let style = if key.is_rename() { " [style=dashed]" } else { "" };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\"{};\n",
                dot_id(&key.origin.to_string()),
                dot_id(&key.target.to_string()),
                style
            ));
        }

        output.push_str("}\n");
        output
    }
}

fn dot_id(raw: &str) -> String {
    raw.replace(':', "_").replace('@', "_").replace('.', "_").replace('"', "_")
}
