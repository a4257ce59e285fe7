//! Four-way navigation over the published graph.
//!
//! | current | up              | down            | left                    | right                        |
//! |---------|-----------------|-----------------|-------------------------|------------------------------|
//! | List    | none            | none            | `upstream_from` Dhammas | children, position order     |
//! | Dhamma  | sibling pos - 1 | sibling pos + 1 | parent List             | downstream targets, in order |
//!
//! Every neighbor set is fetched as one batch per collection. A List view
//! costs two store roundtrips, a Dhamma view at most five, whatever the
//! number of neighbors.

use crate::breadcrumbs::BreadcrumbTrail;
use crate::error::NavigateError;
use ahash::AHashMap;
use dhammagraph_store::{
    DhammaDoc, DocumentStore, EntityId, EntityKind, GraphSnapshot, ListDoc, NodeSummary,
    NotFoundError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Essay text for a Dhamma, when the stored document carries none.
pub trait EssayProvider: Send + Sync {
    fn essay(&self, dhamma_id: EntityId) -> Option<String>;
}

impl EssayProvider for GraphSnapshot {
    fn essay(&self, dhamma_id: EntityId) -> Option<String> {
        self.dhamma(dhamma_id).and_then(|d| d.essay.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentNode {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub pali_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essay: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CurrentNode {
    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigateResponse {
    pub current: CurrentNode,
    pub up: Option<NodeSummary>,
    pub down: Option<NodeSummary>,
    pub left: Vec<NodeSummary>,
    pub right: Vec<NodeSummary>,
    #[serde(default)]
    pub breadcrumbs: Vec<NodeSummary>,
}

/// Serves four-way views from one [`DocumentStore`]. To follow reseeds, build
/// an engine per request over `PublishedGraph::store()`.
pub struct NavigationEngine<S> {
    store: S,
    essays: Option<Arc<dyn EssayProvider>>,
}

impl<S: DocumentStore> NavigationEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store, essays: None }
    }

    /// Fall back to `provider` for Dhammas stored without an essay.
    pub fn with_essays(mut self, provider: Arc<dyn EssayProvider>) -> Self {
        self.essays = Some(provider);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Neighbors of `id`. Breadcrumbs are left empty; see [`Self::navigate_with_trail`].
    pub async fn navigate(&self, id: EntityId) -> Result<NavigateResponse, NavigateError> {
        if let Some(list) = self.store.find_list(id).await? {
            return self.list_view(list).await;
        }
        if let Some(dhamma) = self.store.find_dhamma(id).await? {
            return self.dhamma_view(dhamma).await;
        }
        tracing::debug!(%id, "navigate: no such node");
        Err(NotFoundError::from(id).into())
    }

    /// Like [`Self::navigate`], for an id as received from a client. An id
    /// that does not parse names nothing.
    pub async fn navigate_str(&self, raw: &str) -> Result<NavigateResponse, NavigateError> {
        let id: EntityId = raw.parse().map_err(|_| NotFoundError::new(raw))?;
        self.navigate(id).await
    }

    /// Navigate and record the visit on the session trail. The returned
    /// breadcrumbs end with the current node. A failed lookup leaves the
    /// trail as it was.
    pub async fn navigate_with_trail(
        &self,
        raw: &str,
        trail: &mut BreadcrumbTrail,
    ) -> Result<NavigateResponse, NavigateError> {
        let mut response = self.navigate_str(raw).await?;
        trail.visit(response.current.summary());
        response.breadcrumbs = trail.entries().to_vec();
        Ok(response)
    }

    async fn list_view(&self, list: ListDoc) -> Result<NavigateResponse, NavigateError> {
        let mut wanted: Vec<EntityId> = Vec::with_capacity(list.upstream_from.len() + list.children.len());
        for &id in list.upstream_from.iter().chain(&list.children) {
            if !wanted.contains(&id) {
                wanted.push(id);
            }
        }
        let found = if wanted.is_empty() {
            Vec::new()
        } else {
            self.store.find_dhammas(&wanted).await?
        };
        let by_id: AHashMap<EntityId, DhammaDoc> = found.into_iter().map(|d| (d.id, d)).collect();
        let pick = |ids: &[EntityId]| -> Vec<NodeSummary> {
            ids.iter()
                .filter_map(|id| by_id.get(id))
                .map(DhammaDoc::summary)
                .collect()
        };

        let left = pick(&list.upstream_from);
        let right = pick(&list.children);
        tracing::debug!(list = %list.slug, left = left.len(), right = right.len(), "list view");

        Ok(NavigateResponse {
            current: CurrentNode {
                id: list.id,
                kind: EntityKind::List,
                name: list.name,
                pali_name: list.pali_name,
                essay: None,
                description: list.description,
            },
            up: None,
            down: None,
            left,
            right,
            breadcrumbs: Vec::new(),
        })
    }

    async fn dhamma_view(&self, dhamma: DhammaDoc) -> Result<NavigateResponse, NavigateError> {
        let parent = dhamma.parent_list_id;
        let pos = dhamma.position_in_list;

        let mut list_ids = vec![parent];
        for id in dhamma.downstream_of_kind(EntityKind::List) {
            if !list_ids.contains(&id) {
                list_ids.push(id);
            }
        }
        let mut dhamma_ids: Vec<EntityId> = Vec::new();
        for id in dhamma.downstream_of_kind(EntityKind::Dhamma) {
            if !dhamma_ids.contains(&id) {
                dhamma_ids.push(id);
            }
        }
        let mut positions = Vec::with_capacity(2);
        if let Some(prev) = pos.checked_sub(1) {
            positions.push(prev);
        }
        positions.push(pos + 1);

        let lists_fut = self.store.find_lists(&list_ids);
        let dhammas_fut = async {
            if dhamma_ids.is_empty() {
                Ok(Vec::new())
            } else {
                self.store.find_dhammas(&dhamma_ids).await
            }
        };
        let siblings_fut = self.store.find_dhammas_at(parent, &positions);
        let (lists, targets, siblings) = tokio::join!(lists_fut, dhammas_fut, siblings_fut);
        let (lists, targets, siblings) = (lists?, targets?, siblings?);

        let lists: AHashMap<EntityId, ListDoc> = lists.into_iter().map(|l| (l.id, l)).collect();
        let targets: AHashMap<EntityId, DhammaDoc> = targets.into_iter().map(|d| (d.id, d)).collect();

        let left: Vec<NodeSummary> = lists.get(&parent).map(ListDoc::summary).into_iter().collect();
        let right: Vec<NodeSummary> = dhamma
            .downstream
            .iter()
            .filter_map(|r| match r.target_kind {
                EntityKind::List => lists.get(&r.target_id).map(ListDoc::summary),
                EntityKind::Dhamma => targets.get(&r.target_id).map(DhammaDoc::summary),
            })
            .collect();

        let mut up = None;
        let mut down = None;
        for sibling in &siblings {
            if sibling.parent_list_id != parent {
                continue;
            }
            if Some(sibling.position_in_list) == pos.checked_sub(1) {
                up = Some(sibling.summary());
            } else if sibling.position_in_list == pos + 1 {
                down = Some(sibling.summary());
            }
        }

        let essay = match (&dhamma.essay, &self.essays) {
            (Some(text), _) => Some(text.clone()),
            (None, Some(provider)) => provider.essay(dhamma.id),
            (None, None) => None,
        };
        tracing::debug!(
            dhamma = %dhamma.slug,
            up = up.is_some(),
            down = down.is_some(),
            right = right.len(),
            "dhamma view"
        );

        Ok(NavigateResponse {
            current: CurrentNode {
                id: dhamma.id,
                kind: EntityKind::Dhamma,
                name: dhamma.name,
                pali_name: dhamma.pali_name,
                essay,
                description: None,
            },
            up,
            down,
            left,
            right,
            breadcrumbs: Vec::new(),
        })
    }
}
