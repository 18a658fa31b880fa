//! Responsible inheritance along the parent chain.

use std::collections::HashSet;

use super::NodeIndex;
use crate::models::{LocationNode, Responsible};

/// Responsibles a child of `parent_id` inherits, for a snapshot given as
/// nested roots or flat nodes.
pub fn inherited_responsibles(nodes: &[LocationNode], parent_id: Option<&str>) -> Vec<Responsible> {
    NodeIndex::build(nodes).inherited(parent_id)
}

impl NodeIndex {
    /// Ordered, deduplicated responsibles of `parent_id` and its ancestors.
    ///
    /// Closest node first; within each node its primary comes before the rest.
    /// Every entry has `is_primary == false`. An absent or unknown start yields
    /// an empty list.
    pub fn inherited(&self, parent_id: Option<&str>) -> Vec<Responsible> {
        let Some(start) = parent_id else {
            return Vec::new();
        };

        let mut merger = Merger::default();
        for node in self.chain(start) {
            merger.push_node(&node.responsibles);
        }
        merger.finish()
    }

    /// The display chain of a node: its own primary (still flagged primary),
    /// its other responsibles, then everything it inherits.
    pub fn effective(&self, node_id: &str) -> Vec<Responsible> {
        let Some(node) = self.get(node_id) else {
            return Vec::new();
        };

        let mut merger = Merger::default();
        merger.push_node(&node.responsibles);
        let mut own = merger.finish();
        if let (Some(first), Some(_)) = (own.first_mut(), primary_of(&node.responsibles)) {
            first.is_primary = true;
        }

        let mut seen: HashSet<String> = own.iter().map(Responsible::identity_key).collect();
        for inherited in self.inherited(node.parent_id.as_deref()) {
            if seen.insert(inherited.identity_key()) {
                own.push(inherited);
            }
        }
        own
    }
}

/// Effective responsible chain of `node_id` in a snapshot.
pub fn effective_responsibles(nodes: &[LocationNode], node_id: &str) -> Vec<Responsible> {
    NodeIndex::build(nodes).effective(node_id)
}

fn primary_of(responsibles: &[Responsible]) -> Option<&Responsible> {
    responsibles.iter().find(|r| r.is_primary)
}

/// First-occurrence merge keyed by [`Responsible::identity_key`].
#[derive(Default)]
struct Merger {
    seen: HashSet<String>,
    out: Vec<Responsible>,
}

impl Merger {
    fn push_node(&mut self, responsibles: &[Responsible]) {
        if let Some(primary) = primary_of(responsibles) {
            self.push(primary);
        }
        for r in responsibles {
            self.push(r);
        }
    }

    fn push(&mut self, r: &Responsible) {
        if self.seen.insert(r.identity_key()) {
            self.out.push(Responsible {
                is_primary: false,
                ..r.clone()
            });
        }
    }

    fn finish(self) -> Vec<Responsible> {
        self.out
    }
}
