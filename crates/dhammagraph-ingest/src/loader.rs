//! The bulk graph loader.
//!
//! ```text
//! SourceGraph (slugs)
//!   │ pass 1  materialize Lists and Dhammas, register slugs per kind
//!   │         + column co-occurrence edges (permissive)
//!   │ pass 2  resolve every pending reference under its declared kind
//!   │ pass 3  corrections (narrowings, skip pairs)
//!   │ pass 4  derive upstream_from
//!   ▼
//! GraphSnapshot ──verify──► LoadGuard::publish
//! ```
//!
//! Any error aborts before publish and leaves the previous graph in place.

use crate::cooccurrence::column_downstream;
use crate::corrections::{CorrectionReport, CorrectionTable};
use crate::crossref::{detect_pali_cross_references, pali_fragments, DEFAULT_MIN_FRAGMENT};
use crate::error::LoadError;
use crate::essays::{normalize_quoted_terms, EssaySource, NoEssays};
use crate::graph::WorkingGraph;
use crate::resolver::ReferenceResolver;
use crate::sheet::{SheetParser, Workbook};
use crate::source::{PendingRef, SourceGraph};
use dhammagraph_store::{
    verify_invariants, DhammaDoc, EntityId, EntityKind, GraphSnapshot, ListDoc, LockFile,
    PublishedGraph, StoreError,
};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Derive Dhamma -> List edges from nested-sheet column co-occurrence.
    pub column_cooccurrence: bool,
    /// Declare cross-references between Dhammas sharing a Pali fragment.
    pub detect_cross_references: bool,
    pub min_pali_fragment: usize,
    /// Rewrite quoted Pali terms in essays as `*term*`.
    pub normalize_essay_terms: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            column_cooccurrence: true,
            detect_cross_references: true,
            min_pali_fragment: DEFAULT_MIN_FRAGMENT,
            normalize_essay_terms: true,
        }
    }
}

/// Counts for one completed load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub generation: u64,
    pub lists: usize,
    pub dhammas: usize,
    pub downstream_edges: usize,
    pub upstream_edges: usize,
    pub cross_references: usize,
    pub cooccurrence_edges: usize,
    pub essays: usize,
    pub corrections: CorrectionReport,
}

pub struct GraphLoader {
    config: LoaderConfig,
    corrections: CorrectionTable,
    essays: Box<dyn EssaySource>,
}

impl GraphLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            corrections: CorrectionTable::default(),
            essays: Box::new(NoEssays),
        }
    }

    pub fn with_corrections(mut self, corrections: CorrectionTable) -> Self {
        self.corrections = corrections;
        self
    }

    pub fn with_essays(mut self, essays: impl EssaySource + 'static) -> Self {
        self.essays = Box::new(essays);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Parse a workbook into the slug-addressed source graph, with Pali
    /// cross-references declared when enabled.
    pub fn parse(&self, workbook: &Workbook) -> Result<SourceGraph, LoadError> {
        let mut source = SheetParser::new()?.parse(workbook);
        if self.config.detect_cross_references {
            detect_pali_cross_references(&mut source, self.config.min_pali_fragment);
        }
        Ok(source)
    }

    /// Run every pass and verify. Nothing is published.
    pub fn build(&self, mut source: SourceGraph) -> Result<(GraphSnapshot, LoadSummary), LoadError> {
        let mut summary = LoadSummary::default();
        let mut resolver = ReferenceResolver::new();
        let mut graph = WorkingGraph::new();

        // Pass 1: materialize.
        let terms = if self.config.normalize_essay_terms {
            essay_terms(&source, self.config.min_pali_fragment)
        } else {
            Vec::new()
        };
        for list in source.lists() {
            let mut doc = ListDoc::new(&list.name, &list.pali_name, &list.slug);
            doc.description = list.description.clone();
            resolver.register(EntityKind::List, &list.slug, doc.id)?;
            graph.push_list(doc);
        }
        for d in source.dhammas() {
            let parent = resolver.resolve(&d.parent_list, EntityKind::List)?;
            // Position is assigned when the parent's children are attached.
            let mut doc = DhammaDoc::new(&d.name, &d.pali_name, &d.slug, parent, 0);
            doc.notes = d.notes.clone();
            doc.essay = self.essays.essay_for(&d.slug).map(|text| {
                if terms.is_empty() {
                    text
                } else {
                    normalize_quoted_terms(&text, terms.as_slice())
                }
            });
            summary.essays += usize::from(doc.essay.is_some());
            resolver.register(EntityKind::Dhamma, &d.slug, doc.id)?;
            graph.push_dhamma(doc);
        }
        tracing::info!(
            lists = resolver.len(EntityKind::List),
            dhammas = resolver.len(EntityKind::Dhamma),
            essays = summary.essays,
            "entities materialized"
        );

        if self.config.column_cooccurrence {
            for edge in column_downstream(&source) {
                if source.add_downstream(&edge.dhamma, PendingRef::list(edge.list)) {
                    summary.cooccurrence_edges += 1;
                }
            }
        }

        // Pass 2: resolve and attach.
        for list in source.lists() {
            let list_id = resolver.resolve(&list.slug, EntityKind::List)?;
            let mut children = Vec::with_capacity(list.children.len());
            for slug in &list.children {
                let id = resolver.resolve(slug, EntityKind::Dhamma)?;
                if !children.contains(&id) {
                    children.push(id);
                }
            }
            for (position, &child) in children.iter().enumerate() {
                if let Some(d) = graph.dhamma_mut(child) {
                    if d.parent_list_id == list_id {
                        d.position_in_list = position;
                    }
                }
            }
            if let Some(doc) = graph.list_mut(list_id) {
                doc.children = children;
            }
        }
        for d in source.dhammas() {
            let id = resolver.resolve(&d.slug, EntityKind::Dhamma)?;
            let mut downstream = Vec::with_capacity(d.downstream.len());
            for pending in &d.downstream {
                let edge = resolver.resolve_ref(pending)?;
                if !downstream.contains(&edge) {
                    downstream.push(edge);
                }
            }
            let mut cross_references: Vec<EntityId> = Vec::with_capacity(d.cross_references.len());
            for slug in &d.cross_references {
                let target = resolver.resolve(slug, EntityKind::Dhamma)?;
                if !cross_references.contains(&target) {
                    cross_references.push(target);
                }
            }
            if let Some(doc) = graph.dhamma_mut(id) {
                doc.downstream = downstream;
                doc.cross_references = cross_references;
            }
        }

        // Pass 3: corrections.
        summary.corrections = self.corrections.apply(&mut graph, &resolver)?;

        // Pass 4: back-references.
        summary.upstream_edges = graph.derive_upstream();

        summary.lists = graph.lists().len();
        summary.dhammas = graph.dhammas().len();
        summary.downstream_edges = graph.dhammas().iter().map(|d| d.downstream.len()).sum();
        summary.cross_references = graph.dhammas().iter().map(|d| d.cross_references.len()).sum();

        let snapshot = graph.into_snapshot();
        verify_invariants(&snapshot)?;
        Ok((snapshot, summary))
    }

    /// Build, verify and publish into `published`. A concurrent load fails
    /// with `LoadInProgress`; a failed load publishes nothing.
    pub fn load(
        &self,
        source: SourceGraph,
        published: &PublishedGraph,
    ) -> Result<(Arc<GraphSnapshot>, LoadSummary), LoadError> {
        let guard = published.begin_load()?;
        let (snapshot, mut summary) = self.build(source)?;
        let snapshot = guard.publish(snapshot);
        summary.generation = snapshot.generation();
        tracing::info!(
            generation = summary.generation,
            lists = summary.lists,
            dhammas = summary.dhammas,
            downstream = summary.downstream_edges,
            upstream = summary.upstream_edges,
            "load complete"
        );
        Ok((snapshot, summary))
    }

    pub fn load_workbook(
        &self,
        workbook: &Workbook,
        published: &PublishedGraph,
    ) -> Result<(Arc<GraphSnapshot>, LoadSummary), LoadError> {
        let source = self.parse(workbook)?;
        self.load(source, published)
    }

    /// Full reseed of the snapshot file at `path`, serialized across
    /// processes by a `.lock` file. The previous file, if any, only supplies
    /// the generation number and survives untouched if the load fails. A
    /// previous file that no longer parses is replaced, starting over at
    /// generation 1.
    pub fn seed_file(&self, workbook: &Workbook, path: &Path) -> Result<LoadSummary, LoadError> {
        let _lock = LockFile::acquire(path)?;
        let previous = match GraphSnapshot::load(path) {
            Ok(snapshot) => snapshot,
            Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                GraphSnapshot::default()
            }
            Err(StoreError::Serialization(err)) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "previous snapshot unreadable; reseeding from generation 0"
                );
                GraphSnapshot::default()
            }
            Err(err) => return Err(err.into()),
        };
        let published = PublishedGraph::from_snapshot(previous);
        let (snapshot, summary) = self.load_workbook(workbook, &published)?;
        snapshot.save(path)?;
        Ok(summary)
    }
}

impl Default for GraphLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

/// Every Pali name in the source, whole and split into fragments.
fn essay_terms(source: &SourceGraph, min_len: usize) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let names = source
        .lists()
        .iter()
        .map(|l| l.pali_name.as_str())
        .chain(source.dhammas().iter().map(|d| d.pali_name.as_str()))
        .filter(|p| !p.is_empty());
    for name in names {
        let whole = name.trim().to_string();
        if !terms.contains(&whole) {
            terms.push(whole);
        }
        for fragment in pali_fragments(name, min_len) {
            if !terms.contains(&fragment) {
                terms.push(fragment);
            }
        }
    }
    terms
}
