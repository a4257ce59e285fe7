//! Source workbook parsing.
//!
//! The workbook is the JSON export of two spreadsheet tabs:
//!
//! - **nested**: one header per main column (`"English\n(Pali)"`), then rows
//!   holding one cell per main column plus an expansion item, a Pali term
//!   and free-text notes.
//! - **foundations**: flat `(list, item, pali_term, notes)` rows.
//!
//! Parsing yields a [`SourceGraph`] whose references are still slugs.

use crate::error::SourceError;
use crate::source::{GridRow, PendingRef, SourceGraph};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of leading columns of the nested sheet that name Lists.
pub const MAIN_COLUMNS: usize = 9;

const COUNT_WORDS: &str = r"(?:Three|Four|Five|Six|Seven|Eight|Nine|Ten|Twelve|Thirty.?seven)";

// ============================================================================
// Workbook
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workbook {
    pub nested: NestedSheet,
    #[serde(default)]
    pub foundations: Vec<FoundationRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NestedSheet {
    pub headers: Vec<Option<String>>,
    #[serde(default)]
    pub rows: Vec<NestedRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NestedRow {
    #[serde(default)]
    pub cells: Vec<Option<String>>,
    #[serde(default)]
    pub expansion: Option<String>,
    #[serde(default)]
    pub pali_term: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoundationRow {
    pub list: Option<String>,
    pub item: Option<String>,
    #[serde(default)]
    pub pali_term: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Workbook {
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
}

fn non_empty(cell: Option<&String>) -> Option<&str> {
    cell.map(|s| s.trim()).filter(|s| !s.is_empty())
}

// ============================================================================
// Text helpers
// ============================================================================

/// URL slug: parentheticals and leading `N. ` numbering dropped, lowercase
/// ASCII alphanumerics, runs of whitespace and hyphens collapsed to `-`.
pub fn slugify(text: &str) -> String {
    let mut without_parens = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(close) => {
                without_parens.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    without_parens.push_str(rest);

    let lowered = strip_number_prefix_raw(&without_parens).to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for c in lowered.trim().chars() {
        if c.is_whitespace() || c == '-' {
            pending_dash = true;
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        }
    }
    slug
}

/// `"Four Noble Truths\n(Cattari Ariya-saccani)"` -> `("Four Noble Truths", "Cattari Ariya-saccani")`.
pub fn parse_header(header: &str) -> (String, String) {
    let mut parts = header.split(['\n', '|']);
    let english = parts.next().unwrap_or_default().trim().to_string();
    let pali = parts
        .next()
        .map(|p| p.trim().trim_matches(['(', ')']).to_string())
        .unwrap_or_default();
    (english, pali)
}

/// `"Right View (Samma Ditthi)"` -> `("Right View", "Samma Ditthi")`.
/// Only a trailing parenthetical counts.
pub fn extract_pali(name: &str) -> (String, String) {
    let trimmed = name.trim_end();
    if let Some(body) = trimmed.strip_suffix(')') {
        let after_close = body.rfind(')').map(|i| i + 1).unwrap_or(0);
        if let Some(open) = body[after_close..].find('(').map(|i| i + after_close) {
            let pali = &body[open + 1..];
            if !pali.is_empty() {
                return (trimmed[..open].trim().to_string(), pali.to_string());
            }
        }
    }
    (name.trim().to_string(), String::new())
}

/// `"1. There is Suffering"` -> `"There is Suffering"`.
pub fn strip_number_prefix(text: &str) -> String {
    strip_number_prefix_raw(text).trim().to_string()
}

fn strip_number_prefix_raw(text: &str) -> &str {
    let digits = text.len() - text.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return text;
    }
    match text[digits..].strip_prefix('.') {
        Some(rest) => rest.trim_start(),
        None => text,
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Turns a [`Workbook`] into a [`SourceGraph`].
pub struct SheetParser {
    sublist_with_pali: Regex,
    sublist_described: Regex,
}

/// Sub-list grouping state carried across nested rows.
#[derive(Default)]
struct ActiveSublist {
    list: Option<String>,
    parent: Option<String>,
}

impl SheetParser {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            sublist_with_pali: Regex::new(&format!(
                r"^({COUNT_WORDS}\s+[\w\s&/]+?)\s*\(([^)]+)\)"
            ))?,
            sublist_described: Regex::new(&format!(
                r"^({COUNT_WORDS}\s+[\w\s&/]+?)\s*[\u{{2014}}-]\s"
            ))?,
        })
    }

    pub fn parse(&self, workbook: &Workbook) -> SourceGraph {
        let mut graph = SourceGraph::new();
        self.parse_nested(&workbook.nested, &mut graph);
        self.parse_foundations(&workbook.foundations, &mut graph);
        tracing::info!(
            lists = graph.lists().len(),
            dhammas = graph.dhammas().len(),
            "workbook parsed"
        );
        graph
    }

    /// A named sub-list opened by a notes cell, as `(name, pali)`.
    pub fn sublist_from_notes(&self, notes: &str) -> Option<(String, String)> {
        if let Some(caps) = self.sublist_with_pali.captures(notes) {
            return Some((caps[1].trim().to_string(), caps[2].trim().to_string()));
        }
        self.sublist_described
            .captures(notes)
            .map(|caps| (caps[1].trim().to_string(), String::new()))
    }

    fn parse_nested(&self, sheet: &NestedSheet, graph: &mut SourceGraph) {
        let mut columns = Vec::new();
        for (col, header) in sheet.headers.iter().enumerate().take(MAIN_COLUMNS) {
            let Some(header) = non_empty(header.as_ref()) else {
                continue;
            };
            let (name, pali) = parse_header(header);
            let slug = slugify(&name);
            if slug.is_empty() {
                continue;
            }
            graph.ensure_list(&slug, &name, &pali, None);
            columns.push((col, slug));
        }
        tracing::info!(count = columns.len(), "main lists from column headers");

        let mut active = ActiveSublist::default();
        for row in &sheet.rows {
            let expansion = non_empty(row.expansion.as_ref());
            let pali_term = non_empty(row.pali_term.as_ref()).unwrap_or_default();
            let notes = non_empty(row.notes.as_ref()).unwrap_or_default();

            let mut cells = Vec::new();
            for (col, list_slug) in &columns {
                let Some(cell) = non_empty(row.cells.get(*col).and_then(Option::as_ref)) else {
                    continue;
                };
                let (name, pali) = extract_pali(cell);
                if let Some(slug) = graph.add_member(list_slug, &strip_number_prefix(&name), &pali, None) {
                    cells.push((*col, slug));
                }
            }
            // Deepest non-empty main column.
            let anchor = cells.last().map(|(_, slug)| slug.clone());

            if let Some(expansion) = expansion {
                if let Some((name, pali)) = self.sublist_from_notes(notes) {
                    let slug = slugify(&name);
                    graph.ensure_list(&slug, &name, &pali, None);
                    if let Some(anchor) = &anchor {
                        graph.add_downstream(anchor, PendingRef::list(&slug));
                        active.parent = Some(anchor.clone());
                    }
                    active.list = Some(slug);
                }

                if active.list.is_none() {
                    if let Some(anchor) = &anchor {
                        let anchor_name = graph
                            .dhamma(anchor)
                            .map(|d| d.name.clone())
                            .unwrap_or_default();
                        let implicit = format!("{anchor}-aspects");
                        graph.ensure_list(
                            &implicit,
                            &format!("Aspects of {anchor_name}"),
                            "",
                            Some(&format!("Sub-teachings expanding on {anchor_name}")),
                        );
                        graph.add_downstream(anchor, PendingRef::list(&implicit));
                        active.list = Some(implicit);
                        active.parent = Some(anchor.clone());
                    }
                }

                if let Some(target) = &active.list {
                    let (raw, pali_from_name) = extract_pali(expansion);
                    let pali = if pali_term.is_empty() {
                        pali_from_name
                    } else {
                        pali_term.to_string()
                    };
                    graph.add_member(target, &strip_number_prefix(&raw), &pali, Some(notes));
                }
            }

            if let Some(anchor) = &anchor {
                if let Some(d) = graph.dhamma_mut(anchor) {
                    // First Pali term seen fills a bare anchor, expansion rows included.
                    if d.pali_name.is_empty() && !pali_term.is_empty() {
                        d.pali_name = pali_term.to_string();
                    }
                    if d.notes.is_none() && !notes.is_empty() {
                        d.notes = Some(notes.to_string());
                    }
                }
                if expansion.is_none() && active.list.is_some() && active.parent.as_ref() != Some(anchor) {
                    active = ActiveSublist::default();
                }
            }

            graph.grid.push(GridRow { cells });
        }
        graph.columns = columns;
    }

    fn parse_foundations(&self, rows: &[FoundationRow], graph: &mut SourceGraph) {
        for row in rows {
            let (Some(list), Some(item)) = (non_empty(row.list.as_ref()), non_empty(row.item.as_ref())) else {
                continue;
            };
            let (list_name, list_pali) = extract_pali(list);
            let list_slug = slugify(&list_name);
            if list_slug.is_empty() {
                continue;
            }
            graph.ensure_list(&list_slug, &list_name, &list_pali, None);

            let (item_name, item_pali) = extract_pali(item);
            let pali = if item_pali.is_empty() {
                non_empty(row.pali_term.as_ref()).unwrap_or_default().to_string()
            } else {
                item_pali
            };
            graph.add_member(&list_slug, &item_name, &pali, non_empty(row.notes.as_ref()));
        }
    }
}
