//! Dhammagraph Ingest
//!
//! Turns the source workbook into a verified, id-addressed graph and
//! publishes it:
//!
//! ```text
//! workbook.json ──SheetParser──► SourceGraph ──GraphLoader──► GraphSnapshot
//!                                    ▲               │
//!               crossref (Pali) ─────┘               ├── ReferenceResolver
//!                                                    ├── column co-occurrence
//!               corrections.json ────────────────────┤
//!               essays/{slug}.md ────────────────────┘
//! ```

pub mod cooccurrence;
pub mod corrections;
pub mod crossref;
pub mod error;
pub mod essays;
pub mod graph;
pub mod loader;
pub mod resolver;
pub mod sheet;
pub mod source;

pub use corrections::{CorrectionReport, CorrectionTable, Narrowing, SkipPair};
pub use error::{
    CorrectionIntegrityError, DuplicateSlugError, LoadError, SourceError, UnresolvedSlugError,
};
pub use essays::{normalize_quoted_terms, EssayDir, EssaySource, NoEssays};
pub use loader::{GraphLoader, LoadSummary, LoaderConfig};
pub use resolver::ReferenceResolver;
pub use sheet::{slugify, FoundationRow, NestedRow, NestedSheet, SheetParser, Workbook};
pub use source::{PendingRef, SourceGraph};
