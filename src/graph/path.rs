//! Path Search
//!
//! Breadth-first search over the version graph. Edges are unweighted; among
//! paths of equal length the one whose edges were registered first wins.

use petgraph::graph::NodeIndex;
use std::collections::{HashMap, VecDeque};

use super::VersionGraph;
use crate::error::{PatchError, Result};
use crate::version::{PatchKey, VersionId};

impl VersionGraph {
    /// Shortest sequence of patches from `origin` to `target`.
    ///
    /// Returns an empty path when both are the same node, and
    /// [`PatchError::ImpossibleConversion`] when either node is unknown or
    /// `target` is unreachable.
    pub fn compute_path(&self, origin: &VersionId, target: &VersionId) -> Result<Vec<PatchKey>> {
        if origin == target && self.contains(origin) {
            return Ok(Vec::new());
        }
        if !self.contains(target) {
            return Err(impossible(origin, &target.version));
        }

        self.compute_path_to(origin, |id| id == target)
            .ok_or_else(|| impossible(origin, &target.version))
    }

    /// Shortest sequence of patches from `origin` to the nearest node
    /// satisfying `is_target`, or `None` when there is none.
    ///
    /// `origin` itself is tested first, so an origin that already satisfies
    /// the predicate yields an empty path.
    pub fn compute_path_to<F>(&self, origin: &VersionId, is_target: F) -> Option<Vec<PatchKey>>
    where
        F: Fn(&VersionId) -> bool,
    {
        let &start = self.node_indices.get(origin)?;
        if is_target(origin) {
            return Some(Vec::new());
        }

        let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        parents.insert(start, start);

        while let Some(current) = queue.pop_front() {
            for next in self.successors(current) {
                if parents.contains_key(&next) {
                    continue;
                }
                parents.insert(next, current);

                if is_target(&self.graph[next]) {
                    return Some(self.unwind(&parents, start, next));
                }
                queue.push_back(next);
            }
        }

        None
    }

    fn unwind(
        &self,
        parents: &HashMap<NodeIndex, NodeIndex>,
        start: NodeIndex,
        end: NodeIndex,
    ) -> Vec<PatchKey> {
        let mut path = Vec::new();
        let mut node = end;

        while node != start {
            let parent = parents[&node];
            path.push(PatchKey::new(self.graph[parent].clone(), self.graph[node].clone()));
            node = parent;
        }

        path.reverse();
        path
    }
}

fn impossible(origin: &VersionId, to: &str) -> PatchError {
    PatchError::ImpossibleConversion {
        classname: origin.classname.clone(),
        from: origin.version.clone(),
        to: to.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(classname: &str, version: &str) -> VersionId {
        VersionId::new(classname, version)
    }

    fn chain(graph: &mut VersionGraph, classname: &str, versions: &[&str]) {
        for pair in versions.windows(2) {
            graph.add_edge(&PatchKey::new(v(classname, pair[0]), v(classname, pair[1])));
        }
    }

    #[test]
    fn test_chain_path() {
        let mut graph = VersionGraph::new();
        chain(&mut graph, "Widget", &["1", "2", "3", "4"]);

        let path = graph.compute_path(&v("Widget", "1"), &v("Widget", "4")).unwrap();
        assert_eq!(
            path,
            vec![
                PatchKey::new(v("Widget", "1"), v("Widget", "2")),
                PatchKey::new(v("Widget", "2"), v("Widget", "3")),
                PatchKey::new(v("Widget", "3"), v("Widget", "4")),
            ]
        );
    }

    #[test]
    fn test_no_reverse_path() {
        let mut graph = VersionGraph::new();
        chain(&mut graph, "Widget", &["1", "2", "3", "4"]);

        let err = graph.compute_path(&v("Widget", "4"), &v("Widget", "1")).unwrap_err();
        assert!(matches!(err, PatchError::ImpossibleConversion { .. }));
    }

    #[test]
    fn test_same_node_is_empty_path() {
        let mut graph = VersionGraph::new();
        chain(&mut graph, "Widget", &["1", "2"]);
        assert!(graph.compute_path(&v("Widget", "2"), &v("Widget", "2")).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_nodes() {
        let mut graph = VersionGraph::new();
        chain(&mut graph, "Widget", &["1", "2"]);

        assert!(graph.compute_path(&v("Widget", "1"), &v("Widget", "9")).is_err());
        assert!(graph.compute_path(&v("Gadget", "1"), &v("Widget", "2")).is_err());
        assert!(graph.compute_path(&v("Gadget", "1"), &v("Gadget", "1")).is_err());
    }

    #[test]
    fn test_shortcut_preferred() {
        let mut graph = VersionGraph::new();
        chain(&mut graph, "Widget", &["1", "2", "3", "4"]);
        graph.add_edge(&PatchKey::new(v("Widget", "2"), v("Widget", "4")));

        let path = graph.compute_path(&v("Widget", "1"), &v("Widget", "4")).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1], PatchKey::new(v("Widget", "2"), v("Widget", "4")));
    }

    #[test]
    fn test_tie_break_first_registered_edge() {
        // Two equal-length branches 1 -> a -> 3 and 1 -> b -> 3
        let mut graph = VersionGraph::new();
        graph.add_edge(&PatchKey::new(v("W", "1"), v("W", "a")));
        graph.add_edge(&PatchKey::new(v("W", "1"), v("W", "b")));
        graph.add_edge(&PatchKey::new(v("W", "b"), v("W", "3")));
        graph.add_edge(&PatchKey::new(v("W", "a"), v("W", "3")));

        let path = graph.compute_path(&v("W", "1"), &v("W", "3")).unwrap();
        assert_eq!(path[0].target, v("W", "a"));
    }

    #[test]
    fn test_path_across_rename() {
        let mut graph = VersionGraph::new();
        chain(&mut graph, "Patient", &["1", "2"]);
        graph.add_edge(&PatchKey::new(v("Patient", "2"), v("MedPatient", "1")));
        chain(&mut graph, "MedPatient", &["1", "2"]);

        let path = graph
            .compute_path_to(&v("Patient", "1"), |id| id.classname == "MedPatient" && id.version == "2")
            .unwrap();
        assert_eq!(path.len(), 3);
        assert!(path[1].is_rename());
    }

    #[test]
    fn test_cycle_terminates() {
        let mut graph = VersionGraph::new();
        chain(&mut graph, "W", &["1", "2", "1"]);
        assert!(graph.compute_path_to(&v("W", "1"), |id| id.version == "9").is_none());
    }
}
