//! Column co-occurrence: the nested sheet's implicit zoom edges.
//!
//! A Dhamma in main column X that shares a row with a non-empty cell in a
//! deeper main column Y zooms into Y's List. The edges are permissive; the
//! correction table narrows or drops the ones that overreach.

use crate::source::SourceGraph;
use ahash::AHashSet;

/// A proposed `dhamma -> list` downstream edge, both by slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CooccurrenceEdge {
    pub dhamma: String,
    pub list: String,
}

/// Every co-occurrence edge in `graph`, deduplicated in first-seen order.
pub fn column_downstream(graph: &SourceGraph) -> Vec<CooccurrenceEdge> {
    let list_of_column = |col: usize| {
        graph
            .columns
            .iter()
            .find(|(c, _)| *c == col)
            .map(|(_, slug)| slug.as_str())
    };

    let mut seen = AHashSet::new();
    let mut edges = Vec::new();
    for row in &graph.grid {
        for (col, dhamma_slug) in &row.cells {
            let Some(dhamma) = graph.dhamma(dhamma_slug) else {
                continue;
            };
            for (deeper, _) in row.cells.iter().filter(|(c, _)| c > col) {
                let Some(list) = list_of_column(*deeper) else {
                    continue;
                };
                // Containment, not zoom.
                if dhamma.parent_list == list {
                    continue;
                }
                let edge = CooccurrenceEdge {
                    dhamma: dhamma_slug.clone(),
                    list: list.to_string(),
                };
                if seen.insert(edge.clone()) {
                    edges.push(edge);
                }
            }
        }
    }
    tracing::debug!(count = edges.len(), "column co-occurrence edges");
    edges
}
