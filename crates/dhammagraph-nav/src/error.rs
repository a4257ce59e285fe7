use dhammagraph_store::{NotFoundError, StoreError};
use thiserror::Error;

/// Serve-time failure of one request. Never affects other requests.
#[derive(Debug, Error)]
pub enum NavigateError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl NavigateError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, NavigateError::NotFound(_))
    }
}
