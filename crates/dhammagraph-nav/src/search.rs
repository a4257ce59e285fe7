//! Name search and the list index.

use async_trait::async_trait;
use dhammagraph_store::{DocumentStore, EntityId, EntityKind, ListSummary, StoreError};
use serde::{Deserialize, Serialize};

/// Queries shorter than this (in characters, after trimming) match nothing.
pub const DEFAULT_MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: EntityId,
    pub name: String,
    pub pali_name: String,
    pub kind: EntityKind,
}

#[async_trait]
pub trait NameSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, StoreError>;
}

/// Case-insensitive substring match on English or Pali name. Lists come
/// before Dhammas; each group is ordered by lowercase name.
pub struct StoreSearch<S> {
    store: S,
    min_query_len: usize,
}

impl<S: DocumentStore> StoreSearch<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
        }
    }

    pub fn with_min_query_len(mut self, len: usize) -> Self {
        self.min_query_len = len;
        self
    }
}

fn matches(needle: &str, name: &str, pali_name: &str) -> bool {
    name.to_lowercase().contains(needle) || pali_name.to_lowercase().contains(needle)
}

fn sort_by_name(results: &mut [SearchResult]) {
    results.sort_by_cached_key(|r| r.name.to_lowercase());
}

#[async_trait]
impl<S: DocumentStore> NameSearch for StoreSearch<S> {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, StoreError> {
        let needle = query.trim().to_lowercase();
        if needle.chars().count() < self.min_query_len {
            return Ok(Vec::new());
        }

        let (lists, dhammas) = tokio::try_join!(self.store.all_lists(), self.store.all_dhammas())?;

        let mut list_hits: Vec<SearchResult> = lists
            .into_iter()
            .filter(|l| matches(&needle, &l.name, &l.pali_name))
            .map(|l| SearchResult {
                id: l.id,
                name: l.name,
                pali_name: l.pali_name,
                kind: EntityKind::List,
            })
            .collect();
        let mut dhamma_hits: Vec<SearchResult> = dhammas
            .into_iter()
            .filter(|d| matches(&needle, &d.name, &d.pali_name))
            .map(|d| SearchResult {
                id: d.id,
                name: d.name,
                pali_name: d.pali_name,
                kind: EntityKind::Dhamma,
            })
            .collect();
        sort_by_name(&mut list_hits);
        sort_by_name(&mut dhamma_hits);

        tracing::debug!(
            query = %needle,
            lists = list_hits.len(),
            dhammas = dhamma_hits.len(),
            "search"
        );
        list_hits.append(&mut dhamma_hits);
        Ok(list_hits)
    }
}

/// Every List, ordered by name.
pub async fn list_summaries<S: DocumentStore + ?Sized>(store: &S) -> Result<Vec<ListSummary>, StoreError> {
    let mut lists: Vec<ListSummary> = store.all_lists().await?.iter().map(ListSummary::from).collect();
    lists.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(lists)
}
