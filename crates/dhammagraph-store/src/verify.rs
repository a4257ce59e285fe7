//! Post-load verification.
//!
//! [`verify_invariants`] is the gate the loader runs before publishing: any
//! violation is fatal. [`validate`] produces the longer human-facing report
//! (named checks plus non-fatal warnings) used by `dhammagraph validate`.

use crate::error::{GraphInvariantError, Invariant, InvariantViolation};
use crate::model::{EntityId, EntityKind};
use crate::snapshot::GraphSnapshot;
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeSet;

/// Collect every invariant violation in `snapshot`.
pub fn find_violations(snapshot: &GraphSnapshot) -> Vec<InvariantViolation> {
    let mut out = Vec::new();

    // 3. slugs unique per kind
    for kind in [EntityKind::List, EntityKind::Dhamma] {
        let slugs: Vec<&str> = match kind {
            EntityKind::List => snapshot.lists().iter().map(|l| l.slug.as_str()).collect(),
            EntityKind::Dhamma => snapshot.dhammas().iter().map(|d| d.slug.as_str()).collect(),
        };
        let mut seen = AHashSet::new();
        let mut reported = AHashSet::new();
        for slug in slugs {
            if !seen.insert(slug) && reported.insert(slug) {
                out.push(InvariantViolation::DuplicateSlug {
                    kind,
                    slug: slug.to_string(),
                });
            }
        }
    }

    // Containment symmetry, list side.
    for list in snapshot.lists() {
        for &child in &list.children {
            let owned = snapshot
                .dhamma(child)
                .map(|d| d.parent_list_id == list.id)
                .unwrap_or(false);
            if !owned {
                out.push(InvariantViolation::ChildNotOwned {
                    list: list.slug.clone(),
                    child,
                });
            }
        }
    }

    let mut positions: AHashMap<EntityId, Vec<usize>> = AHashMap::new();
    let mut derived_upstream: AHashMap<EntityId, BTreeSet<EntityId>> = AHashMap::new();

    for d in snapshot.dhammas() {
        // Containment symmetry, dhamma side.
        match snapshot.list(d.parent_list_id) {
            None => out.push(InvariantViolation::OrphanDhamma {
                dhamma: d.slug.clone(),
                parent: d.parent_list_id,
            }),
            Some(parent) if !parent.children.contains(&d.id) => {
                out.push(InvariantViolation::MissingFromParent {
                    dhamma: d.slug.clone(),
                })
            }
            Some(_) => {}
        }
        positions
            .entry(d.parent_list_id)
            .or_default()
            .push(d.position_in_list);

        for r in &d.downstream {
            // 1. containment is not zoom
            if r.is_list(d.parent_list_id) {
                let list = snapshot
                    .list(d.parent_list_id)
                    .map(|l| l.slug.clone())
                    .unwrap_or_else(|| d.parent_list_id.to_string());
                out.push(InvariantViolation::ContainmentAsZoom {
                    dhamma: d.slug.clone(),
                    list,
                });
            }
            // 2. downstream resolves under its declared kind
            if !snapshot.contains(r.target_id, r.target_kind) {
                out.push(InvariantViolation::DanglingDownstream {
                    dhamma: d.slug.clone(),
                    target: r.target_id,
                    kind: r.target_kind,
                });
            }
            if r.target_kind == EntityKind::List {
                derived_upstream.entry(r.target_id).or_default().insert(d.id);
            }
        }

        for &x in &d.cross_references {
            if snapshot.dhamma(x).is_none() {
                out.push(InvariantViolation::DanglingCrossReference {
                    dhamma: d.slug.clone(),
                    target: x,
                });
            }
        }
    }

    for list in snapshot.lists() {
        // 4. contiguous positions
        let mut seen = positions.remove(&list.id).unwrap_or_default();
        seen.sort_unstable();
        let contiguous = seen.iter().enumerate().all(|(i, &p)| i == p);
        if !contiguous {
            out.push(InvariantViolation::PositionGap {
                list: list.slug.clone(),
                positions: seen,
            });
        }

        // 5. upstream_from derived exactly
        let expected = derived_upstream.remove(&list.id).unwrap_or_default();
        let actual: BTreeSet<EntityId> = list.upstream_from.iter().copied().collect();
        let duplicated = actual.len() != list.upstream_from.len();
        if expected != actual || duplicated {
            out.push(InvariantViolation::UpstreamDrift {
                list: list.slug.clone(),
                missing: expected.difference(&actual).copied().collect(),
                unexpected: actual.difference(&expected).copied().collect(),
            });
        }
    }

    out
}

/// The fatal gate: `Ok` only if no invariant is violated.
pub fn verify_invariants(snapshot: &GraphSnapshot) -> Result<(), GraphInvariantError> {
    let violations = find_violations(snapshot);
    if violations.is_empty() {
        Ok(())
    } else {
        for v in &violations {
            tracing::warn!(invariant = v.invariant().label(), violation = %v, "graph invariant violated");
        }
        Err(GraphInvariantError { violations })
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Named pass/fail checks plus warnings that never block a publish.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub checks: Vec<CheckResult>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn add(&mut self, name: &'static str, passed: bool, detail: impl Into<String>) {
        self.checks.push(CheckResult {
            name,
            passed,
            detail: detail.into(),
        });
    }

    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

pub fn validate(snapshot: &GraphSnapshot) -> ValidationReport {
    let mut report = ValidationReport::default();
    let lists = snapshot.lists();
    let dhammas = snapshot.dhammas();

    report.add(
        "Database populated",
        !lists.is_empty() && !dhammas.is_empty(),
        format!("{} lists, {} dhammas", lists.len(), dhammas.len()),
    );

    let violations = find_violations(snapshot);
    let count = |inv: Invariant| violations.iter().filter(|v| v.invariant() == inv).count();
    for inv in [
        Invariant::ContainmentSymmetry,
        Invariant::DownstreamResolves,
        Invariant::CrossReferencesResolve,
        Invariant::ContainmentIsNotZoom,
        Invariant::ContiguousPositions,
        Invariant::DerivedUpstream,
        Invariant::KindQualifiedSlugs,
    ] {
        let n = count(inv);
        let detail = if n == 0 {
            String::new()
        } else {
            format!("{n} violation(s)")
        };
        report.add(inv.label(), n == 0, detail);
    }

    let broken_upstream = lists
        .iter()
        .flat_map(|l| l.upstream_from.iter())
        .filter(|&&id| snapshot.dhamma(id).is_none())
        .count();
    report.add(
        "upstream refs valid",
        broken_upstream == 0,
        if broken_upstream == 0 {
            String::new()
        } else {
            format!("{broken_upstream} broken")
        },
    );

    let mismatched: Vec<String> = lists
        .iter()
        .filter(|l| l.item_count != l.children.len())
        .map(|l| format!("{}: declared={}, actual={}", l.slug, l.item_count, l.children.len()))
        .collect();
    report.add(
        "item counts accurate",
        mismatched.is_empty(),
        mismatched.iter().take(3).cloned().collect::<Vec<_>>().join("; "),
    );

    let with_essays = dhammas.iter().filter(|d| d.essay.is_some()).count();
    if with_essays < dhammas.len() {
        report.warnings.push(format!(
            "essay coverage {with_essays}/{} dhammas",
            dhammas.len()
        ));
    }

    let cyclic = downstream_cycles(snapshot);
    if !cyclic.is_empty() {
        report.warnings.push(format!(
            "{} dhamma(s) reach themselves through downstream zoom (e.g. {})",
            cyclic.len(),
            cyclic.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
        ));
    }

    report
}

/// Slugs of Dhammas that can reach themselves by following downstream edges
/// (into a List's children, or directly to a Dhamma).
pub fn downstream_cycles(snapshot: &GraphSnapshot) -> Vec<String> {
    let successors = |id: EntityId| -> Vec<EntityId> {
        let Some(d) = snapshot.dhamma(id) else {
            return Vec::new();
        };
        let mut next = Vec::new();
        for r in &d.downstream {
            match r.target_kind {
                EntityKind::List => {
                    if let Some(list) = snapshot.list(r.target_id) {
                        next.extend(list.children.iter().copied());
                    }
                }
                EntityKind::Dhamma => next.push(r.target_id),
            }
        }
        next
    };

    let mut cyclic = Vec::new();
    for d in snapshot.dhammas() {
        let mut visited: AHashSet<EntityId> = AHashSet::new();
        let mut stack = successors(d.id);
        let mut found = false;
        while let Some(id) = stack.pop() {
            if id == d.id {
                found = true;
                break;
            }
            if visited.insert(id) {
                stack.extend(successors(id));
            }
        }
        if found {
            cyclic.push(d.slug.clone());
        }
    }
    cyclic
}
