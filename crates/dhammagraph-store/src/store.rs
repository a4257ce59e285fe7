//! Document-store access used at serving time.
//!
//! The interface mirrors a document database: lookup by id, batched lookup of
//! an id set, and a filter query for siblings. Batched calls return matches in
//! no particular order and silently skip ids that do not exist; callers
//! restore the order they need.

use crate::error::StoreError;
use crate::model::{DhammaDoc, EntityId, ListDoc};
use crate::snapshot::GraphSnapshot;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Collection-scoped reads over a published graph.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_list(&self, id: EntityId) -> Result<Option<ListDoc>, StoreError>;

    async fn find_dhamma(&self, id: EntityId) -> Result<Option<DhammaDoc>, StoreError>;

    /// All Lists whose id is in `ids`.
    async fn find_lists(&self, ids: &[EntityId]) -> Result<Vec<ListDoc>, StoreError>;

    /// All Dhammas whose id is in `ids`.
    async fn find_dhammas(&self, ids: &[EntityId]) -> Result<Vec<DhammaDoc>, StoreError>;

    /// Dhammas under `parent` whose `position_in_list` is in `positions`.
    async fn find_dhammas_at(
        &self,
        parent: EntityId,
        positions: &[usize],
    ) -> Result<Vec<DhammaDoc>, StoreError>;

    async fn all_lists(&self) -> Result<Vec<ListDoc>, StoreError>;

    async fn all_dhammas(&self) -> Result<Vec<DhammaDoc>, StoreError>;
}

#[async_trait]
impl DocumentStore for GraphSnapshot {
    async fn find_list(&self, id: EntityId) -> Result<Option<ListDoc>, StoreError> {
        Ok(self.list(id).cloned())
    }

    async fn find_dhamma(&self, id: EntityId) -> Result<Option<DhammaDoc>, StoreError> {
        Ok(self.dhamma(id).cloned())
    }

    async fn find_lists(&self, ids: &[EntityId]) -> Result<Vec<ListDoc>, StoreError> {
        Ok(ids.iter().filter_map(|&id| self.list(id).cloned()).collect())
    }

    async fn find_dhammas(&self, ids: &[EntityId]) -> Result<Vec<DhammaDoc>, StoreError> {
        Ok(ids.iter().filter_map(|&id| self.dhamma(id).cloned()).collect())
    }

    async fn find_dhammas_at(
        &self,
        parent: EntityId,
        positions: &[usize],
    ) -> Result<Vec<DhammaDoc>, StoreError> {
        let Some(list) = self.list(parent) else {
            return Ok(Vec::new());
        };
        Ok(list
            .children
            .iter()
            .filter_map(|&id| self.dhamma(id))
            .filter(|d| d.parent_list_id == parent && positions.contains(&d.position_in_list))
            .cloned()
            .collect())
    }

    async fn all_lists(&self) -> Result<Vec<ListDoc>, StoreError> {
        Ok(self.lists().to_vec())
    }

    async fn all_dhammas(&self) -> Result<Vec<DhammaDoc>, StoreError> {
        Ok(self.dhammas().to_vec())
    }
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn find_list(&self, id: EntityId) -> Result<Option<ListDoc>, StoreError> {
        (**self).find_list(id).await
    }

    async fn find_dhamma(&self, id: EntityId) -> Result<Option<DhammaDoc>, StoreError> {
        (**self).find_dhamma(id).await
    }

    async fn find_lists(&self, ids: &[EntityId]) -> Result<Vec<ListDoc>, StoreError> {
        (**self).find_lists(ids).await
    }

    async fn find_dhammas(&self, ids: &[EntityId]) -> Result<Vec<DhammaDoc>, StoreError> {
        (**self).find_dhammas(ids).await
    }

    async fn find_dhammas_at(
        &self,
        parent: EntityId,
        positions: &[usize],
    ) -> Result<Vec<DhammaDoc>, StoreError> {
        (**self).find_dhammas_at(parent, positions).await
    }

    async fn all_lists(&self) -> Result<Vec<ListDoc>, StoreError> {
        (**self).all_lists().await
    }

    async fn all_dhammas(&self) -> Result<Vec<DhammaDoc>, StoreError> {
        (**self).all_dhammas().await
    }
}

// ============================================================================
// Instrumentation
// ============================================================================

/// Roundtrip counters, one per store operation.
#[derive(Debug, Default)]
pub struct StoreStats {
    pub by_id: AtomicUsize,
    pub batched: AtomicUsize,
    pub filtered: AtomicUsize,
    pub scans: AtomicUsize,
    /// Total ids requested across batched calls.
    pub ids_requested: AtomicUsize,
}

impl StoreStats {
    /// Every call that would be a network roundtrip against a real database.
    pub fn roundtrips(&self) -> usize {
        self.by_id.load(Ordering::Relaxed)
            + self.batched.load(Ordering::Relaxed)
            + self.filtered.load(Ordering::Relaxed)
            + self.scans.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.by_id.store(0, Ordering::Relaxed);
        self.batched.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.scans.store(0, Ordering::Relaxed);
        self.ids_requested.store(0, Ordering::Relaxed);
    }
}

/// Wraps a store and counts the calls made through it.
pub struct InstrumentedStore<S> {
    inner: S,
    stats: Arc<StoreStats>,
}

impl<S: DocumentStore> InstrumentedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: Arc::new(StoreStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<StoreStats> {
        Arc::clone(&self.stats)
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for InstrumentedStore<S> {
    async fn find_list(&self, id: EntityId) -> Result<Option<ListDoc>, StoreError> {
        self.stats.by_id.fetch_add(1, Ordering::Relaxed);
        self.inner.find_list(id).await
    }

    async fn find_dhamma(&self, id: EntityId) -> Result<Option<DhammaDoc>, StoreError> {
        self.stats.by_id.fetch_add(1, Ordering::Relaxed);
        self.inner.find_dhamma(id).await
    }

    async fn find_lists(&self, ids: &[EntityId]) -> Result<Vec<ListDoc>, StoreError> {
        self.stats.batched.fetch_add(1, Ordering::Relaxed);
        self.stats.ids_requested.fetch_add(ids.len(), Ordering::Relaxed);
        self.inner.find_lists(ids).await
    }

    async fn find_dhammas(&self, ids: &[EntityId]) -> Result<Vec<DhammaDoc>, StoreError> {
        self.stats.batched.fetch_add(1, Ordering::Relaxed);
        self.stats.ids_requested.fetch_add(ids.len(), Ordering::Relaxed);
        self.inner.find_dhammas(ids).await
    }

    async fn find_dhammas_at(
        &self,
        parent: EntityId,
        positions: &[usize],
    ) -> Result<Vec<DhammaDoc>, StoreError> {
        self.stats.filtered.fetch_add(1, Ordering::Relaxed);
        self.inner.find_dhammas_at(parent, positions).await
    }

    async fn all_lists(&self) -> Result<Vec<ListDoc>, StoreError> {
        self.stats.scans.fetch_add(1, Ordering::Relaxed);
        self.inner.all_lists().await
    }

    async fn all_dhammas(&self) -> Result<Vec<DhammaDoc>, StoreError> {
        self.stats.scans.fetch_add(1, Ordering::Relaxed);
        self.inner.all_dhammas().await
    }
}
