//! The slug-addressed graph the loader consumes.
//!
//! Entities here reference each other by slug only; ids do not exist yet.
//! Every pending reference carries the kind it must resolve under.

use crate::sheet::slugify;
use ahash::AHashMap;
use dhammagraph_store::EntityKind;

/// A reference that will be resolved once every entity has an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingRef {
    pub slug: String,
    pub kind: EntityKind,
}

impl PendingRef {
    pub fn list(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            kind: EntityKind::List,
        }
    }

    pub fn dhamma(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            kind: EntityKind::Dhamma,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceList {
    pub slug: String,
    pub name: String,
    pub pali_name: String,
    pub description: Option<String>,
    /// Dhamma slugs in teaching order.
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceDhamma {
    pub slug: String,
    pub name: String,
    pub pali_name: String,
    pub parent_list: String,
    pub notes: Option<String>,
    pub downstream: Vec<PendingRef>,
    /// Dhamma slugs, one direction only.
    pub cross_references: Vec<String>,
}

/// One grid row of the nested sheet: main column index and the Dhamma slug
/// materialized from that cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridRow {
    pub cells: Vec<(usize, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceGraph {
    lists: Vec<SourceList>,
    dhammas: Vec<SourceDhamma>,
    list_at: AHashMap<String, usize>,
    dhamma_at: AHashMap<String, usize>,
    /// Main column index -> List slug.
    pub columns: Vec<(usize, String)>,
    pub grid: Vec<GridRow>,
}

impl SourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lists(&self) -> &[SourceList] {
        &self.lists
    }

    pub fn dhammas(&self) -> &[SourceDhamma] {
        &self.dhammas
    }

    pub fn list(&self, slug: &str) -> Option<&SourceList> {
        self.list_at.get(slug).map(|&i| &self.lists[i])
    }

    pub fn dhamma(&self, slug: &str) -> Option<&SourceDhamma> {
        self.dhamma_at.get(slug).map(|&i| &self.dhammas[i])
    }

    pub fn dhamma_mut(&mut self, slug: &str) -> Option<&mut SourceDhamma> {
        match self.dhamma_at.get(slug) {
            Some(&i) => Some(&mut self.dhammas[i]),
            None => None,
        }
    }

    /// Get or create the List `slug`. An existing List keeps its name and
    /// only picks up a Pali name or description it lacked.
    pub fn ensure_list(
        &mut self,
        slug: &str,
        name: &str,
        pali_name: &str,
        description: Option<&str>,
    ) -> &mut SourceList {
        let i = match self.list_at.get(slug) {
            Some(&i) => i,
            None => {
                self.lists.push(SourceList {
                    slug: slug.to_string(),
                    name: name.to_string(),
                    pali_name: String::new(),
                    description: None,
                    children: Vec::new(),
                });
                self.list_at.insert(slug.to_string(), self.lists.len() - 1);
                tracing::debug!(slug, "list created");
                self.lists.len() - 1
            }
        };
        let list = &mut self.lists[i];
        if list.pali_name.is_empty() && !pali_name.is_empty() {
            list.pali_name = pali_name.to_string();
        }
        if list.description.is_none() {
            list.description = description.map(str::to_string);
        }
        list
    }

    /// Add a member named `name` to `list_slug` and return its slug.
    ///
    /// A Dhamma is owned by exactly one List. If the slug is already owned by
    /// a different List, the new member becomes `{list_slug}--{slug}` and the
    /// two copies are declared cross-references of each other. Re-adding a
    /// member to the same List only fills its empty Pali name and notes.
    /// Returns `None` when the name slugifies to nothing.
    pub fn add_member(
        &mut self,
        list_slug: &str,
        name: &str,
        pali_name: &str,
        notes: Option<&str>,
    ) -> Option<String> {
        let base = slugify(name);
        if base.is_empty() {
            tracing::warn!(list = list_slug, name, "skipping member with empty slug");
            return None;
        }
        let slug = match self.dhamma(&base) {
            Some(existing) if existing.parent_list != list_slug => format!("{list_slug}--{base}"),
            _ => base.clone(),
        };

        if let Some(existing) = self.dhamma_mut(&slug) {
            if existing.pali_name.is_empty() && !pali_name.is_empty() {
                existing.pali_name = pali_name.to_string();
            }
            if existing.notes.is_none() {
                existing.notes = notes.filter(|n| !n.is_empty()).map(str::to_string);
            }
            return Some(slug);
        }

        self.dhammas.push(SourceDhamma {
            slug: slug.clone(),
            name: name.trim().to_string(),
            pali_name: pali_name.to_string(),
            parent_list: list_slug.to_string(),
            notes: notes.filter(|n| !n.is_empty()).map(str::to_string),
            downstream: Vec::new(),
            cross_references: Vec::new(),
        });
        self.dhamma_at.insert(slug.clone(), self.dhammas.len() - 1);
        if let Some(&i) = self.list_at.get(list_slug) {
            self.lists[i].children.push(slug.clone());
        }

        if slug != base {
            tracing::debug!(slug = %slug, shared = %base, "member re-slugged for exclusive ownership");
            self.declare_cross_reference(&slug, &base);
            self.declare_cross_reference(&base, &slug);
        }
        Some(slug)
    }

    /// Append a downstream edge unless an identical one is already present.
    pub fn add_downstream(&mut self, dhamma_slug: &str, target: PendingRef) -> bool {
        match self.dhamma_mut(dhamma_slug) {
            Some(d) if !d.downstream.contains(&target) => {
                d.downstream.push(target);
                true
            }
            _ => false,
        }
    }

    /// Declare `from -> to`. One direction; callers declare both when they mean both.
    pub fn declare_cross_reference(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return false;
        }
        match self.dhamma_mut(from) {
            Some(d) if !d.cross_references.iter().any(|x| x == to) => {
                d.cross_references.push(to.to_string());
                true
            }
            _ => false,
        }
    }
}
