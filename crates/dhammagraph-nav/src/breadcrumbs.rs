//! Session breadcrumbs.
//!
//! The graph has no single root and cross-links give many paths to one
//! node, so ancestry is whatever path this session took to get here.

use dhammagraph_store::{EntityId, NodeSummary};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TRAIL_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadcrumbTrail {
    entries: Vec<NodeSummary>,
    limit: usize,
}

impl Default for BreadcrumbTrail {
    fn default() -> Self {
        Self::with_limit(DEFAULT_TRAIL_LIMIT)
    }
}

impl BreadcrumbTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// A trail keeping at most `limit` entries (at least one).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record a visit. Returning to a node already on the trail cuts the
    /// trail back to it; otherwise the node is appended and the oldest
    /// entries fall off past the limit.
    pub fn visit(&mut self, node: NodeSummary) {
        if let Some(i) = self.position(node.id) {
            self.entries.truncate(i);
        }
        self.entries.push(node);
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
    }

    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.entries.iter().position(|n| n.id == id)
    }

    pub fn entries(&self) -> &[NodeSummary] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
