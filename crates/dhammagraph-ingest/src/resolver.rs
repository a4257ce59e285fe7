//! Slug -> id resolution, one table per entity kind.
//!
//! The two tables are never merged: a List and a Dhamma may share a slug
//! (`noble-eightfold-path` is both), and the caller always says which
//! collection a reference points into.

use crate::error::{DuplicateSlugError, UnresolvedSlugError};
use crate::source::PendingRef;
use ahash::AHashMap;
use dhammagraph_store::{EntityId, EntityKind, EntityRef};

#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    lists: AHashMap<String, EntityId>,
    dhammas: AHashMap<String, EntityId>,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: EntityKind) -> &AHashMap<String, EntityId> {
        match kind {
            EntityKind::List => &self.lists,
            EntityKind::Dhamma => &self.dhammas,
        }
    }

    pub fn register(
        &mut self,
        kind: EntityKind,
        slug: &str,
        id: EntityId,
    ) -> Result<(), DuplicateSlugError> {
        let table = match kind {
            EntityKind::List => &mut self.lists,
            EntityKind::Dhamma => &mut self.dhammas,
        };
        if table.contains_key(slug) {
            return Err(DuplicateSlugError {
                slug: slug.to_string(),
                kind,
            });
        }
        table.insert(slug.to_string(), id);
        Ok(())
    }

    pub fn resolve(&self, slug: &str, kind: EntityKind) -> Result<EntityId, UnresolvedSlugError> {
        self.table(kind)
            .get(slug)
            .copied()
            .ok_or_else(|| UnresolvedSlugError {
                slug: slug.to_string(),
                kind,
            })
    }

    /// Resolve a pending reference into a kind-tagged edge.
    pub fn resolve_ref(&self, pending: &PendingRef) -> Result<EntityRef, UnresolvedSlugError> {
        let id = self.resolve(&pending.slug, pending.kind)?;
        Ok(EntityRef {
            target_id: id,
            target_kind: pending.kind,
        })
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.table(kind).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_same_slug_resolves_per_kind() {
        let mut r = ReferenceResolver::new();
        let list = EntityId::new();
        let dhamma = EntityId::new();
        r.register(EntityKind::List, "noble-eightfold-path", list).unwrap();
        r.register(EntityKind::Dhamma, "noble-eightfold-path", dhamma).unwrap();

        assert_eq!(r.resolve("noble-eightfold-path", EntityKind::List).unwrap(), list);
        assert_eq!(r.resolve("noble-eightfold-path", EntityKind::Dhamma).unwrap(), dhamma);
    }

    #[test]
    fn test_missing_slug_names_kind() {
        let mut r = ReferenceResolver::new();
        r.register(EntityKind::List, "five-hindrances", EntityId::new()).unwrap();

        let err = r.resolve("five-hindrances", EntityKind::Dhamma).unwrap_err();
        assert_eq!(err.kind, EntityKind::Dhamma);
        assert_eq!(err.to_string(), "unresolved dhamma slug `five-hindrances`");
    }

    #[test]
    fn test_duplicate_within_kind_is_rejected() {
        let mut r = ReferenceResolver::new();
        r.register(EntityKind::Dhamma, "faith", EntityId::new()).unwrap();
        assert!(r.register(EntityKind::Dhamma, "faith", EntityId::new()).is_err());
        assert_eq!(r.len(EntityKind::Dhamma), 1);
    }

    proptest! {
        #[test]
        fn prop_kinds_never_bleed(slugs in proptest::collection::hash_set("[a-z]{1,8}(-[a-z]{1,8}){0,2}", 1..20)) {
            let mut r = ReferenceResolver::new();
            let mut expected = Vec::new();
            for (i, slug) in slugs.iter().enumerate() {
                let id = EntityId::new();
                // Every third slug also exists as the other kind.
                let kind = if i % 2 == 0 { EntityKind::List } else { EntityKind::Dhamma };
                r.register(kind, slug, id).unwrap();
                expected.push((slug.clone(), kind, id));
                if i % 3 == 0 {
                    let other = match kind {
                        EntityKind::List => EntityKind::Dhamma,
                        EntityKind::Dhamma => EntityKind::List,
                    };
                    let other_id = EntityId::new();
                    r.register(other, slug, other_id).unwrap();
                    expected.push((slug.clone(), other, other_id));
                }
            }
            for (slug, kind, id) in expected {
                prop_assert_eq!(r.resolve(&slug, kind).unwrap(), id);
            }
        }
    }
}
