//! Path lookup inside an atom graph
//!
//! A path is a `/`-separated list of segments starting at an object. A
//! segment names an attribute when the current value is an object, a key
//! when it is a map, and an index when it is a sequence:
//!
//! ```text
//! values/patients/0/studies
//! ```

use crate::atom::{Atom, AtomGraph, ObjectId};

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn step<'a>(graph: &'a AtomGraph, value: &'a Atom, segment: &str) -> Option<&'a Atom> {
    match value {
        Atom::Object(id) => graph.get(*id)?.attribute(segment),
        Atom::Map(entries) => entries.get(segment),
        Atom::Sequence(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

/// The value at `path` below `root`. An empty path has no value because the
/// root itself is not an attribute.
pub fn atom_at<'a>(graph: &'a AtomGraph, root: ObjectId, path: &str) -> Option<&'a Atom> {
    let mut parts = segments(path);
    let mut current = graph.get(root)?.attribute(parts.next()?)?;

    for segment in parts {
        current = step(graph, current, segment)?;
    }
    Some(current)
}

/// The object referenced at `path` below `root`
pub fn object_at(graph: &AtomGraph, root: ObjectId, path: &str) -> Option<ObjectId> {
    atom_at(graph, root, path)?.as_object()
}

/// Point the reference at `path` to `replacement`, returning the object it
/// referenced before.
///
/// # Panics
///
/// Panics if `path` does not lead to an object reference.
pub fn swap_object_at(
    graph: &mut AtomGraph,
    root: ObjectId,
    path: &str,
    replacement: ObjectId,
) -> ObjectId {
    let parts: Vec<&str> = segments(path).collect();
    let Some(last) = parts.last().copied() else {
        panic!("empty path below {}", root);
    };

    // The final slot lives in the last object met before it; every segment
    // after that object only walks its containers.
    let root_ref = Atom::Object(root);
    let mut current = &root_ref;
    let mut owner = root;
    let mut start = 0;
    for (i, segment) in parts[..parts.len() - 1].iter().enumerate() {
        let Some(next) = step(graph, current, segment) else {
            panic!("path '{}' does not resolve below {} at '{}'", path, root, segment);
        };
        if let Atom::Object(id) = next {
            owner = *id;
            start = i + 1;
        }
        current = next;
    }

    let remaining = &parts[start..];
    let Some(object) = graph.get_mut(owner) else {
        panic!("path '{}' does not resolve below {}", path, root);
    };
    let Some(mut slot) = object.attribute_mut(remaining[0]) else {
        panic!("path '{}' does not resolve below {} at '{}'", path, root, remaining[0]);
    };
    for segment in &remaining[1..] {
        let next = match slot {
            Atom::Map(entries) => entries.get_mut(*segment),
            Atom::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        };
        let Some(next) = next else {
            panic!("path '{}' does not resolve below {} at '{}'", path, root, segment);
        };
        slot = next;
    }

    match slot {
        Atom::Object(previous) => {
            let previous = *previous;
            *slot = Atom::Object(replacement);
            tracing::debug!(path, from = %previous, to = %replacement, "swapped object reference");
            previous
        }
        other => panic!(
            "path '{}' leads to a {:?} value, not an object reference (last segment '{}')",
            path,
            other.kind(),
            last
        ),
    }
}
