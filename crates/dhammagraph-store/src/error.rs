//! Error types shared by the store, the loader and the navigation engine.

use crate::model::{EntityId, EntityKind};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the document store or its on-disk snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("A graph load is already in progress")]
    LoadInProgress,

    #[error(
        "Lock file {} is held by {}; if no seed is running, delete it and retry",
        .path.display(),
        describe_holder(.holder)
    )]
    LockHeld { path: PathBuf, holder: Option<u32> },

    #[error("Store backend error: {0}")]
    Backend(String),
}

fn describe_holder(holder: &Option<u32>) -> String {
    match holder {
        Some(pid) => format!("process {pid}"),
        None => "an unknown process".to_string(),
    }
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Serve-time: the requested id names no List and no Dhamma.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("node not found: {raw}")]
pub struct NotFoundError {
    pub raw: String,
}

impl NotFoundError {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

impl From<EntityId> for NotFoundError {
    fn from(id: EntityId) -> Self {
        Self::new(id.to_string())
    }
}

// ============================================================================
// Graph invariants
// ============================================================================

/// The graph invariants checked after every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invariant {
    /// A Dhamma never zooms into its own parent List.
    ContainmentIsNotZoom,
    /// Every downstream target exists in the collection its kind names.
    DownstreamResolves,
    /// Slugs are unique within a kind.
    KindQualifiedSlugs,
    /// Sibling positions are `0..n` per parent.
    ContiguousPositions,
    /// `upstream_from` equals the derived back-reference set.
    DerivedUpstream,
    /// `children` and `parent_list_id` agree.
    ContainmentSymmetry,
    /// Cross-references point at existing Dhammas.
    CrossReferencesResolve,
}

impl Invariant {
    pub const fn label(self) -> &'static str {
        match self {
            Invariant::ContainmentIsNotZoom => "containment is not zoom",
            Invariant::DownstreamResolves => "downstream targets resolve",
            Invariant::KindQualifiedSlugs => "slugs unique per kind",
            Invariant::ContiguousPositions => "contiguous sibling positions",
            Invariant::DerivedUpstream => "upstream_from derived",
            Invariant::ContainmentSymmetry => "containment symmetric",
            Invariant::CrossReferencesResolve => "cross-references resolve",
        }
    }
}

/// One concrete breach, named by slug where one is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    ContainmentAsZoom {
        dhamma: String,
        list: String,
    },
    DanglingDownstream {
        dhamma: String,
        target: EntityId,
        kind: EntityKind,
    },
    DuplicateSlug {
        kind: EntityKind,
        slug: String,
    },
    PositionGap {
        list: String,
        positions: Vec<usize>,
    },
    UpstreamDrift {
        list: String,
        missing: Vec<EntityId>,
        unexpected: Vec<EntityId>,
    },
    ChildNotOwned {
        list: String,
        child: EntityId,
    },
    MissingFromParent {
        dhamma: String,
    },
    OrphanDhamma {
        dhamma: String,
        parent: EntityId,
    },
    DanglingCrossReference {
        dhamma: String,
        target: EntityId,
    },
}

impl InvariantViolation {
    pub fn invariant(&self) -> Invariant {
        match self {
            InvariantViolation::ContainmentAsZoom { .. } => Invariant::ContainmentIsNotZoom,
            InvariantViolation::DanglingDownstream { .. } => Invariant::DownstreamResolves,
            InvariantViolation::DuplicateSlug { .. } => Invariant::KindQualifiedSlugs,
            InvariantViolation::PositionGap { .. } => Invariant::ContiguousPositions,
            InvariantViolation::UpstreamDrift { .. } => Invariant::DerivedUpstream,
            InvariantViolation::ChildNotOwned { .. }
            | InvariantViolation::MissingFromParent { .. }
            | InvariantViolation::OrphanDhamma { .. } => Invariant::ContainmentSymmetry,
            InvariantViolation::DanglingCrossReference { .. } => Invariant::CrossReferencesResolve,
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::ContainmentAsZoom { dhamma, list } => {
                write!(f, "{dhamma} lists its own parent {list} as downstream")
            }
            InvariantViolation::DanglingDownstream {
                dhamma,
                target,
                kind,
            } => write!(f, "{dhamma} -> {kind} {target} does not exist"),
            InvariantViolation::DuplicateSlug { kind, slug } => {
                write!(f, "{kind} slug `{slug}` is used more than once")
            }
            InvariantViolation::PositionGap { list, positions } => {
                write!(f, "{list} has non-contiguous positions {positions:?}")
            }
            InvariantViolation::UpstreamDrift {
                list,
                missing,
                unexpected,
            } => write!(
                f,
                "{list} upstream_from drifted ({} missing, {} unexpected)",
                missing.len(),
                unexpected.len()
            ),
            InvariantViolation::ChildNotOwned { list, child } => {
                write!(f, "{list} lists child {child} owned elsewhere")
            }
            InvariantViolation::MissingFromParent { dhamma } => {
                write!(f, "{dhamma} is missing from its parent's children")
            }
            InvariantViolation::OrphanDhamma { dhamma, parent } => {
                write!(f, "{dhamma} names missing parent list {parent}")
            }
            InvariantViolation::DanglingCrossReference { dhamma, target } => {
                write!(f, "{dhamma} cross-references missing dhamma {target}")
            }
        }
    }
}

/// Load-time: post-load verification failed.
#[derive(Debug, Clone, Error)]
#[error("{}", summarize(.violations))]
pub struct GraphInvariantError {
    pub violations: Vec<InvariantViolation>,
}

impl GraphInvariantError {
    /// Distinct invariants that broke, in first-seen order.
    pub fn broken(&self) -> Vec<Invariant> {
        let mut out: Vec<Invariant> = Vec::new();
        for v in &self.violations {
            let inv = v.invariant();
            if !out.contains(&inv) {
                out.push(inv);
            }
        }
        out
    }
}

fn summarize(violations: &[InvariantViolation]) -> String {
    const SHOWN: usize = 3;
    let mut parts: Vec<String> = violations.iter().take(SHOWN).map(|v| v.to_string()).collect();
    if violations.len() > SHOWN {
        parts.push(format!("and {} more", violations.len() - SHOWN));
    }
    format!(
        "{} graph invariant violation(s): {}",
        violations.len(),
        parts.join("; ")
    )
}
