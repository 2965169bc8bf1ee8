//! Typed element queries.
//!
//! A query is a container node, a path of child element names and a
//! predicate checked on the final step. `find(item_meta, &["links", "link"],
//! attr_eq("type", "x-im/author"))` is the equivalent of the selector
//! `itemMeta > links > link[type="x-im/author"]`.

use super::arena::{NodeId, XmlDom};

impl XmlDom {
    /// First element at `path` below `root` that satisfies `predicate`, in
    /// document order.
    pub fn find_one<P>(&self, root: NodeId, path: &[&str], predicate: P) -> Option<NodeId>
    where
        P: Fn(&XmlDom, NodeId) -> bool,
    {
        let (last, steps) = path.split_last()?;
        let mut frontier = vec![root];
        for step in steps {
            frontier = self.step(&frontier, step);
        }
        frontier.iter().find_map(|&parent| {
            self.child_elements(parent)
                .find(|&id| self.local_name(id) == Some(*last) && predicate(self, id))
        })
    }

    /// All elements at `path` below `root` that satisfy `predicate`, in
    /// document order. Never fails; no match yields an empty vector.
    pub fn find_all<P>(&self, root: NodeId, path: &[&str], predicate: P) -> Vec<NodeId>
    where
        P: Fn(&XmlDom, NodeId) -> bool,
    {
        let Some((last, steps)) = path.split_last() else {
            return Vec::new();
        };
        let mut frontier = vec![root];
        for step in steps {
            frontier = self.step(&frontier, step);
        }
        frontier
            .iter()
            .flat_map(|&parent| self.child_elements(parent))
            .filter(|&id| self.local_name(id) == Some(*last) && predicate(self, id))
            .collect()
    }

    /// First child element with the given local name.
    pub fn child(&self, parent: NodeId, local: &str) -> Option<NodeId> {
        self.find_one(parent, &[local], any_element)
    }

    fn step(&self, frontier: &[NodeId], name: &str) -> Vec<NodeId> {
        frontier
            .iter()
            .flat_map(|&parent| self.child_elements(parent))
            .filter(|&id| self.local_name(id) == Some(name))
            .collect()
    }
}

/// Predicate accepting every element.
pub fn any_element(_: &XmlDom, _: NodeId) -> bool {
    true
}

/// Predicate: attribute `name` equals `value`.
pub fn attr_eq<'a>(name: &'a str, value: &'a str) -> impl Fn(&XmlDom, NodeId) -> bool + 'a {
    move |dom, id| dom.attr(id, name) == Some(value)
}

/// Predicate: attribute `name` contains `needle`.
pub fn attr_contains<'a>(name: &'a str, needle: &'a str) -> impl Fn(&XmlDom, NodeId) -> bool + 'a {
    move |dom, id| dom.attr(id, name).is_some_and(|v| v.contains(needle))
}

/// Predicate: attribute `name` equals any of `values`.
pub fn attr_in<'a, S: AsRef<str>>(
    name: &'a str,
    values: &'a [S],
) -> impl Fn(&XmlDom, NodeId) -> bool + 'a {
    move |dom, id| {
        dom.attr(id, name)
            .is_some_and(|v| values.iter().any(|candidate| candidate.as_ref() == v))
    }
}
