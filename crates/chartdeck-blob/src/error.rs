//! Error types for chart artifact storage.

use thiserror::Error;

pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("failed to create {backend} store: {message}")]
    Backend { backend: String, message: String },

    #[error("unsupported storage backend: {0}")]
    UnsupportedBackend(String),

    #[error("invalid artifact filename {0:?}")]
    InvalidFilename(String),

    #[error("locator {0:?} does not belong to this store")]
    ForeignLocator(String),

    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("artifact storage error: {0}")]
    Storage(String),
}
