//! Immutable graph snapshots and the atomically swapped published pointer.
//!
//! A load never mutates the graph that readers see. It builds a complete
//! [`GraphSnapshot`], verifies it, and only then swaps the `Arc` held by
//! [`PublishedGraph`]. Readers clone the `Arc` once and keep a consistent view
//! for the whole request even if a reseed lands halfway through.

use crate::error::StoreError;
use crate::model::{DhammaDoc, EntityId, EntityKind, ListDoc};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Snapshot
// ============================================================================

/// A complete, self-consistent graph: both collections plus lookup indexes.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    generation: u64,
    built_at: Option<DateTime<Utc>>,
    lists: Vec<ListDoc>,
    dhammas: Vec<DhammaDoc>,
    list_index: AHashMap<EntityId, usize>,
    dhamma_index: AHashMap<EntityId, usize>,
    list_slugs: AHashMap<String, usize>,
    dhamma_slugs: AHashMap<String, usize>,
}

/// On-disk layout. Indexes are rebuilt on load, never persisted.
#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    generation: u64,
    #[serde(default)]
    built_at: Option<DateTime<Utc>>,
    lists: Vec<ListDoc>,
    dhammas: Vec<DhammaDoc>,
}

impl GraphSnapshot {
    /// Build a snapshot from both collections, in load order.
    pub fn new(lists: Vec<ListDoc>, dhammas: Vec<DhammaDoc>) -> Self {
        let mut snapshot = Self {
            lists,
            dhammas,
            built_at: Some(Utc::now()),
            ..Self::default()
        };
        snapshot.reindex();
        snapshot
    }

    fn reindex(&mut self) {
        self.list_index.clear();
        self.dhamma_index.clear();
        self.list_slugs.clear();
        self.dhamma_slugs.clear();
        for (i, doc) in self.lists.iter().enumerate() {
            self.list_index.insert(doc.id, i);
            self.list_slugs.entry(doc.slug.clone()).or_insert(i);
        }
        for (i, doc) in self.dhammas.iter().enumerate() {
            self.dhamma_index.insert(doc.id, i);
            self.dhamma_slugs.entry(doc.slug.clone()).or_insert(i);
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty() && self.dhammas.is_empty()
    }

    pub fn lists(&self) -> &[ListDoc] {
        &self.lists
    }

    pub fn dhammas(&self) -> &[DhammaDoc] {
        &self.dhammas
    }

    pub fn list(&self, id: EntityId) -> Option<&ListDoc> {
        self.list_index.get(&id).and_then(|&i| self.lists.get(i))
    }

    pub fn dhamma(&self, id: EntityId) -> Option<&DhammaDoc> {
        self.dhamma_index.get(&id).and_then(|&i| self.dhammas.get(i))
    }

    /// Kind of the entity `id` addresses, if any.
    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        if self.list_index.contains_key(&id) {
            Some(EntityKind::List)
        } else if self.dhamma_index.contains_key(&id) {
            Some(EntityKind::Dhamma)
        } else {
            None
        }
    }

    pub fn contains(&self, id: EntityId, kind: EntityKind) -> bool {
        match kind {
            EntityKind::List => self.list_index.contains_key(&id),
            EntityKind::Dhamma => self.dhamma_index.contains_key(&id),
        }
    }

    pub fn list_by_slug(&self, slug: &str) -> Option<&ListDoc> {
        self.list_slugs.get(slug).and_then(|&i| self.lists.get(i))
    }

    pub fn dhamma_by_slug(&self, slug: &str) -> Option<&DhammaDoc> {
        self.dhamma_slugs.get(slug).and_then(|&i| self.dhammas.get(i))
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn to_json(&self) -> Result<String, StoreError> {
        let file = SnapshotFile {
            generation: self.generation,
            built_at: self.built_at,
            lists: self.lists.clone(),
            dhammas: self.dhammas.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        let file: SnapshotFile = serde_json::from_str(text)?;
        let mut snapshot = Self {
            generation: file.generation,
            built_at: file.built_at,
            lists: file.lists,
            dhammas: file.dhammas,
            ..Self::default()
        };
        snapshot.reindex();
        Ok(snapshot)
    }

    /// Write to `path` via a sibling temp file and a rename, so a reader of
    /// `path` sees either the old snapshot or the new one.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = self.to_json()?;
        let tmp = tmp_path(path);
        std::fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
        tracing::info!(
            path = %path.display(),
            generation = self.generation,
            lists = self.lists.len(),
            dhammas = self.dhammas.len(),
            "snapshot written"
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Self::from_json(&text)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// Published pointer
// ============================================================================

/// The graph readers currently see.
pub struct PublishedGraph {
    current: RwLock<Arc<GraphSnapshot>>,
    load_lock: Mutex<()>,
}

impl PublishedGraph {
    /// Start with an empty graph (generation 0).
    pub fn new() -> Self {
        Self::from_snapshot(GraphSnapshot::default())
    }

    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            load_lock: Mutex::new(()),
        }
    }

    /// Pin the current snapshot. Cheap; never waits on a running load.
    pub fn current(&self) -> Arc<GraphSnapshot> {
        self.current.read().clone()
    }

    /// The current snapshot as a [`DocumentStore`](crate::DocumentStore) for
    /// one request. Every read through it sees the same generation, even if a
    /// load publishes in between; take a fresh one per request.
    pub fn store(&self) -> Arc<GraphSnapshot> {
        self.current()
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    /// Take the single-writer load lock. Dropping the guard releases it, so a
    /// failed load leaves both the lock and the published graph as they were.
    pub fn begin_load(&self) -> Result<LoadGuard<'_>, StoreError> {
        let guard = self
            .load_lock
            .try_lock()
            .ok_or(StoreError::LoadInProgress)?;
        Ok(LoadGuard {
            published: self,
            _guard: guard,
        })
    }
}

impl Default for PublishedGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive right to publish the next generation.
pub struct LoadGuard<'a> {
    published: &'a PublishedGraph,
    _guard: MutexGuard<'a, ()>,
}

impl LoadGuard<'_> {
    pub fn next_generation(&self) -> u64 {
        self.published.generation() + 1
    }

    /// Swap in `snapshot` as the next generation and release the load lock.
    pub fn publish(self, mut snapshot: GraphSnapshot) -> Arc<GraphSnapshot> {
        snapshot.generation = self.next_generation();
        let snapshot = Arc::new(snapshot);
        *self.published.current.write() = Arc::clone(&snapshot);
        tracing::info!(generation = snapshot.generation, "graph published");
        snapshot
    }
}

// ============================================================================
// Cross-process lock file
// ============================================================================

/// A `<snapshot>.lock` file held for the duration of an on-disk reseed.
/// Removed on drop, including on error paths. The file holds the owner's
/// process id so a lock left behind by a crashed seed can be identified.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    pub fn acquire(snapshot_path: &Path) -> Result<Self, StoreError> {
        let mut name = snapshot_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        let path = snapshot_path.with_file_name(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let lock = Self { path };
                writeln!(file, "{}", std::process::id())
                    .map_err(|e| StoreError::io(lock.path.clone(), e))?;
                Ok(lock)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = Self::read_holder(&path);
                Err(StoreError::LockHeld { path, holder })
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Process id recorded in an existing lock file, if it can be read.
    pub fn read_holder(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to remove lock file");
        }
    }
}
