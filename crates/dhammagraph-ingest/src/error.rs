//! Load-time errors. Every one of these aborts the load before publish.

use dhammagraph_store::{EntityKind, GraphInvariantError, StoreError};
use std::path::PathBuf;
use thiserror::Error;

/// A slug that names no entity of the kind the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unresolved {kind} slug `{slug}`")]
pub struct UnresolvedSlugError {
    pub slug: String,
    pub kind: EntityKind,
}

/// Two entities of one kind registered under the same slug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} slug `{slug}` registered twice")]
pub struct DuplicateSlugError {
    pub slug: String,
    pub kind: EntityKind,
}

/// A narrowing whose replacement members are not where it says they are.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrectionIntegrityError {
    #[error("narrowing {dhamma} -> {list}: `{member}` belongs to another list")]
    MemberNotInList {
        dhamma: String,
        list: String,
        member: String,
    },

    #[error("narrowing {dhamma} -> {list}: `{member}` claims position {position} but that slot holds another child")]
    PositionMismatch {
        dhamma: String,
        list: String,
        member: String,
        position: usize,
    },
}

/// Failures reading the workbook or the corrections file.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed source file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid sub-list pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Any failure of a load. The previously published graph is untouched.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Unresolved(#[from] UnresolvedSlugError),

    #[error(transparent)]
    DuplicateSlug(#[from] DuplicateSlugError),

    #[error(transparent)]
    Correction(#[from] CorrectionIntegrityError),

    #[error(transparent)]
    Invariants(#[from] GraphInvariantError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
