//! Location hierarchy: canonical index, responsible inheritance and filters.
//!
//! The canonical form of the tree is a flat map keyed by node id. Nested
//! `children` only exist on the wire and are rebuilt by [`NodeIndex::nested`].

mod filter;
mod inherit;

pub use filter::*;
pub use inherit::*;

use std::collections::{HashMap, HashSet};

use crate::models::LocationNode;

/// Flat id → node index over a hierarchy snapshot.
///
/// Stored nodes have empty `children`; a node reached only through nesting
/// gets its enclosing node as `parent_id`.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    nodes: HashMap<String, LocationNode>,
    order: Vec<String>,
}

impl NodeIndex {
    /// Index a snapshot given as nested roots, as a flat list, or a mix of both.
    /// The first occurrence of an id wins.
    pub fn build(nodes: &[LocationNode]) -> Self {
        let mut index = Self::default();
        index.visit(nodes, None);
        index
    }

    /// Index flat nodes, e.g. rows loaded from storage.
    pub fn from_flat(nodes: impl IntoIterator<Item = LocationNode>) -> Self {
        let mut index = Self::default();
        for node in nodes {
            index.insert(node, None);
        }
        index
    }

    fn visit(&mut self, nodes: &[LocationNode], enclosing: Option<&str>) {
        for node in nodes {
            let mut flat = node.clone();
            flat.children = Vec::new();
            self.insert(flat, enclosing);
            if !node.children.is_empty() {
                self.visit(&node.children, Some(node.id.as_str()));
            }
        }
    }

    fn insert(&mut self, mut node: LocationNode, enclosing: Option<&str>) {
        if self.nodes.contains_key(&node.id) {
            return;
        }
        if node.parent_id.is_none() {
            node.parent_id = enclosing.map(str::to_string);
        }
        node.children.clear();
        self.order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&LocationNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in the order they were first indexed.
    pub fn iter(&self) -> impl Iterator<Item = &LocationNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn parent_of(&self, id: &str) -> Option<&LocationNode> {
        self.get(id)
            .and_then(|n| n.parent_id.as_deref())
            .and_then(|pid| self.get(pid))
    }

    pub fn children_of(&self, id: &str) -> Vec<&LocationNode> {
        self.iter()
            .filter(|n| n.parent_id.as_deref() == Some(id))
            .collect()
    }

    /// Nodes without a parent, or whose parent is not in the snapshot.
    pub fn roots(&self) -> Vec<&LocationNode> {
        self.iter()
            .filter(|n| match n.parent_id.as_deref() {
                Some(pid) => !self.contains(pid),
                None => true,
            })
            .collect()
    }

    /// `id` followed by its ancestors, closest first.
    ///
    /// Stops at a node without parent, at a dangling `parent_id`, or at the
    /// first node already visited.
    pub fn chain(&self, id: &str) -> Vec<&LocationNode> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(id);

        while let Some(node) = current {
            if !seen.insert(node.id.as_str()) {
                tracing::warn!(node = %node.id, "Cycle in hierarchy parent chain");
                break;
            }
            chain.push(node);
            current = node.parent_id.as_deref().and_then(|pid| self.get(pid));
        }
        chain
    }

    /// Depth of a node; roots are 0.
    pub fn depth(&self, id: &str) -> usize {
        self.chain(id).len().saturating_sub(1)
    }

    /// `id` and every node below it, parents before children.
    pub fn subtree_ids(&self, id: &str) -> Vec<String> {
        if !self.contains(id) {
            return Vec::new();
        }

        let mut ids = vec![id.to_string()];
        let mut seen: HashSet<String> = ids.iter().cloned().collect();
        let mut cursor = 0;
        while cursor < ids.len() {
            let children: Vec<String> = self
                .children_of(&ids[cursor])
                .into_iter()
                .map(|n| n.id.clone())
                .collect();
            for child in children {
                if seen.insert(child.clone()) {
                    ids.push(child);
                }
            }
            cursor += 1;
        }
        ids
    }

    /// Rebuild the nested representation, roots first.
    pub fn nested(&self) -> Vec<LocationNode> {
        let mut visiting = HashSet::new();
        self.roots()
            .into_iter()
            .map(|root| self.nest(root, &mut visiting))
            .collect()
    }

    fn nest<'a>(&'a self, node: &'a LocationNode, visiting: &mut HashSet<&'a str>) -> LocationNode {
        visiting.insert(node.id.as_str());
        let pending: Vec<&LocationNode> = self
            .children_of(&node.id)
            .into_iter()
            .filter(|child| !visiting.contains(child.id.as_str()))
            .collect();
        let children = pending
            .into_iter()
            .map(|child| self.nest(child, visiting))
            .collect();
        visiting.remove(node.id.as_str());

        LocationNode {
            children,
            ..node.clone()
        }
    }
}
