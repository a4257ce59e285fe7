//! The id-addressed graph under construction.
//!
//! Mutable while the loader's passes run; frozen into a
//! [`GraphSnapshot`] once every pass has finished.

use ahash::AHashMap;
use dhammagraph_store::{DhammaDoc, EntityId, EntityKind, GraphSnapshot, ListDoc};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct WorkingGraph {
    lists: Vec<ListDoc>,
    dhammas: Vec<DhammaDoc>,
    list_at: AHashMap<EntityId, usize>,
    dhamma_at: AHashMap<EntityId, usize>,
}

impl WorkingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_list(&mut self, doc: ListDoc) {
        self.list_at.insert(doc.id, self.lists.len());
        self.lists.push(doc);
    }

    pub fn push_dhamma(&mut self, doc: DhammaDoc) {
        self.dhamma_at.insert(doc.id, self.dhammas.len());
        self.dhammas.push(doc);
    }

    pub fn lists(&self) -> &[ListDoc] {
        &self.lists
    }

    pub fn dhammas(&self) -> &[DhammaDoc] {
        &self.dhammas
    }

    pub fn dhammas_mut(&mut self) -> impl Iterator<Item = &mut DhammaDoc> {
        self.dhammas.iter_mut()
    }

    pub fn list(&self, id: EntityId) -> Option<&ListDoc> {
        self.list_at.get(&id).map(|&i| &self.lists[i])
    }

    pub fn list_mut(&mut self, id: EntityId) -> Option<&mut ListDoc> {
        match self.list_at.get(&id) {
            Some(&i) => Some(&mut self.lists[i]),
            None => None,
        }
    }

    pub fn dhamma(&self, id: EntityId) -> Option<&DhammaDoc> {
        self.dhamma_at.get(&id).map(|&i| &self.dhammas[i])
    }

    pub fn dhamma_mut(&mut self, id: EntityId) -> Option<&mut DhammaDoc> {
        match self.dhamma_at.get(&id) {
            Some(&i) => Some(&mut self.dhammas[i]),
            None => None,
        }
    }

    /// Recompute every List's `upstream_from` and `item_count` from scratch.
    ///
    /// `upstream_from` lists each zooming Dhamma once, in Dhamma load order.
    pub fn derive_upstream(&mut self) -> usize {
        let mut upstream: AHashMap<EntityId, Vec<EntityId>> = AHashMap::new();
        for d in &self.dhammas {
            let targets: BTreeSet<EntityId> = d.downstream_of_kind(EntityKind::List).collect();
            for target in targets {
                upstream.entry(target).or_default().push(d.id);
            }
        }
        let mut edges = 0;
        for list in &mut self.lists {
            list.upstream_from = upstream.remove(&list.id).unwrap_or_default();
            list.item_count = list.children.len();
            edges += list.upstream_from.len();
        }
        edges
    }

    pub fn into_snapshot(self) -> GraphSnapshot {
        GraphSnapshot::new(self.lists, self.dhammas)
    }
}
