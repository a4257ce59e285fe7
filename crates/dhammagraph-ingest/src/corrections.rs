//! Declarative relationship corrections.
//!
//! Co-occurrence over-approximates: a Dhamma that relates to only part of a
//! List gets an edge to the whole List. Corrections are data, not code:
//!
//! - a **narrowing** replaces `dhamma -> broad List` with one Dhamma edge per
//!   listed member (an empty member list just removes the edge);
//! - a **skip pair** deletes every edge from a Dhamma of `source_list` to the
//!   List `target_list`.
//!
//! Applying a table twice yields the same edges as applying it once.

use crate::error::{CorrectionIntegrityError, LoadError, SourceError};
use crate::graph::WorkingGraph;
use crate::resolver::ReferenceResolver;
use dhammagraph_store::{EntityId, EntityKind, EntityRef};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrowing {
    /// Dhamma slug whose downstream edge is narrowed.
    pub source: String,
    /// List slug of the over-broad edge.
    pub broad_target: String,
    /// Dhamma slugs, each a child of `broad_target`.
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipPair {
    pub source_list: String,
    pub target_list: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionTable {
    #[serde(default)]
    pub narrowings: Vec<Narrowing>,
    #[serde(default)]
    pub skips: Vec<SkipPair>,
}

/// What one application changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionReport {
    pub broad_edges_removed: usize,
    pub member_edges_added: usize,
    pub skipped_edges_removed: usize,
}

impl CorrectionReport {
    pub fn changed(&self) -> bool {
        *self != Self::default()
    }
}

impl CorrectionTable {
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SourceError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.narrowings.is_empty() && self.skips.is_empty()
    }

    /// Apply every narrowing, then every skip pair.
    pub fn apply(
        &self,
        graph: &mut WorkingGraph,
        resolver: &ReferenceResolver,
    ) -> Result<CorrectionReport, LoadError> {
        let mut report = CorrectionReport::default();
        for narrowing in &self.narrowings {
            apply_narrowing(narrowing, graph, resolver, &mut report)?;
        }
        for skip in &self.skips {
            report.skipped_edges_removed += apply_skip(skip, graph, resolver)?;
        }
        tracing::info!(
            broad_removed = report.broad_edges_removed,
            members_added = report.member_edges_added,
            skipped = report.skipped_edges_removed,
            "corrections applied"
        );
        Ok(report)
    }
}

fn apply_narrowing(
    narrowing: &Narrowing,
    graph: &mut WorkingGraph,
    resolver: &ReferenceResolver,
    report: &mut CorrectionReport,
) -> Result<(), LoadError> {
    let source_id = resolver.resolve(&narrowing.source, EntityKind::Dhamma)?;
    let broad_id = resolver.resolve(&narrowing.broad_target, EntityKind::List)?;

    let mut members: Vec<EntityId> = Vec::with_capacity(narrowing.members.len());
    for slug in &narrowing.members {
        let id = resolver.resolve(slug, EntityKind::Dhamma)?;
        check_member(narrowing, graph, broad_id, id, slug)?;
        if !members.contains(&id) {
            members.push(id);
        }
    }

    let Some(source) = graph.dhamma_mut(source_id) else {
        return Ok(());
    };
    let broad = EntityRef::list(broad_id);
    let had_broad = source.downstream.contains(&broad);
    if !had_broad {
        tracing::debug!(
            dhamma = %narrowing.source,
            list = %narrowing.broad_target,
            "broad edge absent; ensuring members only"
        );
    }

    let mut missing: Vec<EntityRef> = members
        .iter()
        .map(|&id| EntityRef::dhamma(id))
        .filter(|r| !source.downstream.contains(r))
        .collect();
    report.member_edges_added += missing.len();

    // Members take the broad edge's slot so stored order stays meaningful.
    let mut rebuilt = Vec::with_capacity(source.downstream.len() + missing.len());
    for edge in source.downstream.drain(..) {
        if edge == broad {
            report.broad_edges_removed += 1;
            rebuilt.append(&mut missing);
        } else {
            rebuilt.push(edge);
        }
    }
    rebuilt.append(&mut missing);
    source.downstream = rebuilt;
    Ok(())
}

/// A member must be the child of `broad` sitting at its own position.
fn check_member(
    narrowing: &Narrowing,
    graph: &WorkingGraph,
    broad: EntityId,
    member: EntityId,
    member_slug: &str,
) -> Result<(), CorrectionIntegrityError> {
    let position = graph
        .dhamma(member)
        .filter(|d| d.parent_list_id == broad)
        .map(|d| d.position_in_list)
        .ok_or_else(|| CorrectionIntegrityError::MemberNotInList {
            dhamma: narrowing.source.clone(),
            list: narrowing.broad_target.clone(),
            member: member_slug.to_string(),
        })?;
    let slot = graph.list(broad).and_then(|l| l.children.get(position)).copied();
    if slot != Some(member) {
        return Err(CorrectionIntegrityError::PositionMismatch {
            dhamma: narrowing.source.clone(),
            list: narrowing.broad_target.clone(),
            member: member_slug.to_string(),
            position,
        });
    }
    Ok(())
}

fn apply_skip(
    skip: &SkipPair,
    graph: &mut WorkingGraph,
    resolver: &ReferenceResolver,
) -> Result<usize, LoadError> {
    let source_list = resolver.resolve(&skip.source_list, EntityKind::List)?;
    let target = EntityRef::list(resolver.resolve(&skip.target_list, EntityKind::List)?);
    let mut removed = 0;
    for d in graph
        .dhammas_mut()
        .filter(|d| d.parent_list_id == source_list)
    {
        let before = d.downstream.len();
        d.downstream.retain(|r| *r != target);
        removed += before - d.downstream.len();
    }
    if removed > 0 {
        tracing::debug!(
            source_list = %skip.source_list,
            target_list = %skip.target_list,
            removed,
            "skip pair applied"
        );
    }
    Ok(removed)
}
