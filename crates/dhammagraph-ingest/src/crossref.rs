//! Cross-references between Dhammas that share a Pali term.
//!
//! `Upekkha` is both a Brahma Vihara and a Factor of Awakening. When two
//! Dhammas in different Lists share a Pali fragment, each is declared a
//! cross-reference of the other. Both directions are declared here, at the
//! producer; the loader attaches exactly what it is given.

use crate::source::SourceGraph;
use ahash::AHashMap;

pub const DEFAULT_MIN_FRAGMENT: usize = 3;

/// Lowercased Pali fragments of at least `min_len` characters.
pub fn pali_fragments(pali: &str, min_len: usize) -> Vec<String> {
    let lowered = pali.to_lowercase();
    let mut out: Vec<String> = Vec::new();
    for fragment in lowered.split(|c: char| matches!(c, '/' | '(' | ')' | ',') || c.is_whitespace()) {
        if fragment.chars().count() >= min_len && !out.iter().any(|f| f == fragment) {
            out.push(fragment.to_string());
        }
    }
    out
}

/// Declare cross-references for every shared fragment. Returns the number
/// of newly declared (directed) edges.
pub fn detect_pali_cross_references(graph: &mut SourceGraph, min_len: usize) -> usize {
    let mut by_fragment: AHashMap<String, Vec<String>> = AHashMap::new();
    let mut order: Vec<String> = Vec::new();
    for d in graph.dhammas() {
        for fragment in pali_fragments(&d.pali_name, min_len) {
            let slugs = by_fragment.entry(fragment.clone()).or_insert_with(|| {
                order.push(fragment);
                Vec::new()
            });
            if !slugs.contains(&d.slug) {
                slugs.push(d.slug.clone());
            }
        }
    }

    let mut pairs: Vec<(String, String)> = Vec::new();
    for fragment in &order {
        let Some(slugs) = by_fragment.get(fragment) else {
            continue;
        };
        for (i, a) in slugs.iter().enumerate() {
            for b in &slugs[i + 1..] {
                let parents = graph
                    .dhamma(a)
                    .zip(graph.dhamma(b))
                    .map(|(da, db)| (da.parent_list.as_str(), db.parent_list.as_str()));
                match parents {
                    Some((pa, pb)) if pa != pb => pairs.push((a.clone(), b.clone())),
                    _ => {}
                }
            }
        }
    }

    let mut declared = 0;
    for (a, b) in pairs {
        declared += usize::from(graph.declare_cross_reference(&a, &b));
        declared += usize::from(graph.declare_cross_reference(&b, &a));
    }
    tracing::info!(declared, "cross-references from shared Pali terms");
    declared
}
