//! Entity schema: Lists, Dhammas and the typed references between them.
//!
//! Lists and Dhammas live in separate collections. A raw [`EntityId`] carries
//! no kind information, so every stored edge that may point at either
//! collection is an [`EntityRef`] (`{target_id, target_kind}`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Stable identifier assigned to an entity when it is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Allocate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(raw: Uuid) -> Self {
        Self(raw)
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Which collection an id addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    List,
    Dhamma,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::List => "list",
            EntityKind::Dhamma => "dhamma",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(EntityKind::List),
            "dhamma" => Ok(EntityKind::Dhamma),
            other => Err(format!("unknown entity kind `{other}` (expected list|dhamma)")),
        }
    }
}

/// A kind-tagged reference. Never resolve `target_id` without `target_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub target_id: EntityId,
    pub target_kind: EntityKind,
}

impl EntityRef {
    pub const fn list(id: EntityId) -> Self {
        Self {
            target_id: id,
            target_kind: EntityKind::List,
        }
    }

    pub const fn dhamma(id: EntityId) -> Self {
        Self {
            target_id: id,
            target_kind: EntityKind::Dhamma,
        }
    }

    pub fn is_list(&self, id: EntityId) -> bool {
        self.target_kind == EntityKind::List && self.target_id == id
    }
}

// ============================================================================
// Documents
// ============================================================================

/// A named, ordered container of Dhammas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListDoc {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub pali_name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owned Dhammas in teaching order.
    #[serde(default)]
    pub children: Vec<EntityId>,
    /// Dhammas whose `downstream` points here. Derived at load time.
    #[serde(default)]
    pub upstream_from: Vec<EntityId>,
    #[serde(default)]
    pub item_count: usize,
}

impl ListDoc {
    pub fn new(name: impl Into<String>, pali_name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            pali_name: pali_name.into(),
            slug: slug.into(),
            description: None,
            children: Vec::new(),
            upstream_from: Vec::new(),
            item_count: 0,
        }
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id,
            name: self.name.clone(),
            kind: EntityKind::List,
        }
    }
}

/// A single teaching, owned by exactly one List.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DhammaDoc {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub pali_name: String,
    pub slug: String,
    pub parent_list_id: EntityId,
    /// Zero-based rank among siblings.
    pub position_in_list: usize,
    #[serde(default)]
    pub downstream: Vec<EntityRef>,
    #[serde(default)]
    pub cross_references: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essay: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DhammaDoc {
    pub fn new(
        name: impl Into<String>,
        pali_name: impl Into<String>,
        slug: impl Into<String>,
        parent_list_id: EntityId,
        position_in_list: usize,
    ) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            pali_name: pali_name.into(),
            slug: slug.into(),
            parent_list_id,
            position_in_list,
            downstream: Vec::new(),
            cross_references: Vec::new(),
            essay: None,
            notes: None,
        }
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id,
            name: self.name.clone(),
            kind: EntityKind::Dhamma,
        }
    }

    /// Downstream targets of one kind, in stored order.
    pub fn downstream_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = EntityId> + '_ {
        self.downstream
            .iter()
            .filter(move |r| r.target_kind == kind)
            .map(|r| r.target_id)
    }
}

// ============================================================================
// Summaries
// ============================================================================

/// The minimum a neighbor exposes to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
}

/// Row of the "all lists" index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSummary {
    pub id: EntityId,
    pub name: String,
    pub pali_name: String,
    pub slug: String,
    pub item_count: usize,
}

impl From<&ListDoc> for ListSummary {
    fn from(doc: &ListDoc) -> Self {
        Self {
            id: doc.id,
            name: doc.name.clone(),
            pali_name: doc.pali_name.clone(),
            slug: doc.slug.clone(),
            item_count: doc.item_count,
        }
    }
}
