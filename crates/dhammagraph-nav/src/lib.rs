//! Dhammagraph Navigation
//!
//! Serve-time reads over a published graph: the four-way neighbor view,
//! session breadcrumbs, name search and essay markup.
//!
//! ```text
//!                 up (previous sibling)
//!                          ▲
//!   left (parent, or  ◄─ current ─►  right (children, or
//!   upstream Dhammas)      │          downstream targets)
//!                          ▼
//!                 down (next sibling)
//! ```
//!
//! All reads go through [`dhammagraph_store::DocumentStore`], so the engine
//! works the same against an in-memory snapshot or a remote backend.

pub mod breadcrumbs;
pub mod engine;
pub mod error;
pub mod markup;
pub mod search;

pub use breadcrumbs::{BreadcrumbTrail, DEFAULT_TRAIL_LIMIT};
pub use engine::{CurrentNode, EssayProvider, NavigateResponse, NavigationEngine};
pub use error::NavigateError;
pub use markup::{emphasis_spans, Span};
pub use search::{list_summaries, NameSearch, SearchResult, StoreSearch, DEFAULT_MIN_QUERY_LEN};
