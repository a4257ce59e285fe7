//! Dhammagraph Store
//!
//! Schema and serving-side storage for the dhamma knowledge graph:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        PUBLISHED GRAPH                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │   loader ──build──► GraphSnapshot ──verify──► LoadGuard::publish │
//! │                                                   │              │
//! │                                                   ▼              │
//! │                               RwLock<Arc<GraphSnapshot>>         │
//! │                                                   │              │
//! │              readers pin an Arc ◄─────────────────┘              │
//! │                     │                                            │
//! │                     ▼                                            │
//! │              DocumentStore (by id / id set / sibling filter)     │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Features
//!
//! - **Kind-tagged edges**: `EntityRef {target_id, target_kind}` everywhere a
//!   reference may address either collection
//! - **Atomic publish**: build, verify, then swap one pointer
//! - **Batched reads**: the store API has no per-item loops to fall into
//! - **Verification**: every graph invariant is checked before publish

pub mod error;
pub mod model;
pub mod snapshot;
pub mod store;
pub mod verify;

#[cfg(test)]
mod tests;

pub use error::{
    GraphInvariantError, Invariant, InvariantViolation, NotFoundError, StoreError,
};
pub use model::{
    DhammaDoc, EntityId, EntityKind, EntityRef, ListDoc, ListSummary, NodeSummary,
};
pub use snapshot::{GraphSnapshot, LoadGuard, LockFile, PublishedGraph};
pub use store::{DocumentStore, InstrumentedStore, StoreStats};
pub use verify::{validate, verify_invariants, CheckResult, ValidationReport};
