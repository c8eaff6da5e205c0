//! Structural comparison of two object graphs
//!
//! Objects are compared by meta information and attributes, following
//! references on both sides in lock step. A pair of objects already under
//! comparison is not compared again, so cyclic graphs terminate.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;

use crate::atom::{Atom, AtomGraph, AtomObject, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Modified,
}

/// One difference, located by a `/`-separated path from the compared roots.
/// Meta information entries are prefixed with `@`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Difference {
    pub path: String,
    pub kind: DiffKind,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        write!(f, "{:?} {}", self.kind, path)
    }
}

/// Differences between `left` and `right`, empty when they are equivalent
pub fn compare(
    left_graph: &AtomGraph,
    left: ObjectId,
    right_graph: &AtomGraph,
    right: ObjectId,
) -> Vec<Difference> {
    let mut comparer = Comparer {
        left: left_graph,
        right: right_graph,
        visited: HashSet::new(),
        differences: Vec::new(),
    };
    comparer.objects(left, right, "");
    comparer.differences
}

struct Comparer<'a> {
    left: &'a AtomGraph,
    right: &'a AtomGraph,
    visited: HashSet<(ObjectId, ObjectId)>,
    differences: Vec<Difference>,
}

impl Comparer<'_> {
    fn push(&mut self, path: String, kind: DiffKind) {
        self.differences.push(Difference { path, kind });
    }

    fn objects(&mut self, left: ObjectId, right: ObjectId, path: &str) {
        if !self.visited.insert((left, right)) {
            return;
        }
        let (left_graph, right_graph) = (self.left, self.right);
        let (l, r) = match (left_graph.get(left), right_graph.get(right)) {
            (Some(l), Some(r)) => (l, r),
            (None, None) => return,
            _ => return self.push(path.to_string(), DiffKind::Modified),
        };

        self.meta(l, r, path);

        let names: BTreeSet<&str> = l.attribute_names().chain(r.attribute_names()).collect();
        for name in names {
            let child = format!("{}/{}", path, name);
            match (l.attribute(name), r.attribute(name)) {
                (Some(a), Some(b)) => self.atoms(a, b, &child),
                (None, Some(_)) => self.push(child, DiffKind::Added),
                (Some(_), None) => self.push(child, DiffKind::Removed),
                (None, None) => {}
            }
        }
    }

    fn meta(&mut self, l: &AtomObject, r: &AtomObject, path: &str) {
        let keys: BTreeSet<&String> = l.meta.keys().chain(r.meta.keys()).collect();
        for key in keys {
            let kind = match (l.meta.get(key), r.meta.get(key)) {
                (Some(a), Some(b)) if a == b => continue,
                (Some(_), Some(_)) => DiffKind::Modified,
                (None, _) => DiffKind::Added,
                (_, None) => DiffKind::Removed,
            };
            self.push(format!("{}/@{}", path, key), kind);
        }
    }

    fn atoms(&mut self, a: &Atom, b: &Atom, path: &str) {
        match (a, b) {
            (Atom::Object(x), Atom::Object(y)) => self.objects(*x, *y, path),
            (Atom::Sequence(xs), Atom::Sequence(ys)) => {
                for idx in 0..xs.len().max(ys.len()) {
                    let child = format!("{}/{}", path, idx);
                    match (xs.get(idx), ys.get(idx)) {
                        (Some(x), Some(y)) => self.atoms(x, y, &child),
                        (None, Some(_)) => self.push(child, DiffKind::Added),
                        (Some(_), None) => self.push(child, DiffKind::Removed),
                        (None, None) => {}
                    }
                }
            }
            (Atom::Map(xs), Atom::Map(ys)) => {
                let keys: BTreeSet<&String> = xs.keys().chain(ys.keys()).collect();
                for key in keys {
                    let child = format!("{}/{}", path, key);
                    match (xs.get(key), ys.get(key)) {
                        (Some(x), Some(y)) => self.atoms(x, y, &child),
                        (None, Some(_)) => self.push(child, DiffKind::Added),
                        (Some(_), None) => self.push(child, DiffKind::Removed),
                        (None, None) => {}
                    }
                }
            }
            (x, y) if x == y => {}
            _ => self.push(path.to_string(), DiffKind::Modified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (AtomGraph, ObjectId) {
        let mut graph = AtomGraph::new();
        let a = graph.insert(AtomObject::new("A", "1"));
        let b = graph.insert(AtomObject::new("B", "1"));
        graph[a].set_attribute("peer", Atom::Object(b));
        graph[a].set_attribute("name", Atom::string("a"));
        graph[b].set_attribute("peer", Atom::Object(a));
        (graph, a)
    }

    #[test]
    fn test_identical_cyclic_graphs() {
        let (graph, root) = pair();
        let copy = graph.clone();
        assert!(compare(&graph, root, &copy, root).is_empty());
    }

    #[test]
    fn test_reports_paths() {
        let (graph, root) = pair();
        let mut other = graph.clone();
        let b = other[root].attribute("peer").and_then(Atom::as_object).unwrap();
        other[b].set_attribute("extra", Atom::Boolean(true));
        other[b].set_meta_info("version", "2");
        other[root].set_attribute("name", Atom::string("changed"));

        let diffs = compare(&graph, root, &other, root);
        assert_eq!(
            diffs,
            vec![
                Difference { path: "/name".into(), kind: DiffKind::Modified },
                Difference { path: "/peer/@version".into(), kind: DiffKind::Modified },
                Difference { path: "/peer/extra".into(), kind: DiffKind::Added },
            ]
        );
    }

    #[test]
    fn test_sequence_length_change() {
        let mut graph = AtomGraph::new();
        let root = graph.insert(AtomObject::new("A", "1"));
        graph[root].set_attribute("items", Atom::Sequence(vec![Atom::Numeric(1.0)]));
        let mut other = graph.clone();
        other[root].set_attribute("items", Atom::Sequence(vec![]));

        let diffs = compare(&graph, root, &other, root);
        assert_eq!(diffs, vec![Difference { path: "/items/0".into(), kind: DiffKind::Removed }]);
    }
}
