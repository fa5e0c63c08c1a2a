//! Blob storage port for snapshot documents.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for blob store operations.
pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

/// Flat, name-addressed object storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under `name`. Objects are write-once: an existing
    /// object is never replaced.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::AlreadyExists`] when `name` is taken, or
    /// another [`BlobStoreError`] when the object cannot be written.
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> BlobStoreResult<()>;

    /// Reads the object stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::NotFound`] when no such object exists.
    async fn download(&self, name: &str) -> BlobStoreResult<Vec<u8>>;

    /// Lists the names of all objects starting with `prefix`, in ascending
    /// lexicographic order.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when the listing cannot be produced.
    async fn list(&self, prefix: &str) -> BlobStoreResult<Vec<String>>;

    /// Deletes the object under `name`; deleting a missing object succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when the object exists but cannot be
    /// removed.
    async fn delete(&self, name: &str) -> BlobStoreResult<()>;

    /// Returns whether an object exists under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when existence cannot be determined.
    async fn exists(&self, name: &str) -> BlobStoreResult<bool>;
}

/// Errors returned by blob store implementations.
#[derive(Debug, Clone, Error)]
pub enum BlobStoreError {
    /// No object exists under the name.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// An object already exists under the name.
    #[error("blob already exists: {0}")]
    AlreadyExists(String),

    /// The name cannot be mapped onto the backing store.
    #[error("invalid blob name: {0}")]
    InvalidName(String),

    /// Backend failure.
    #[error("blob backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl BlobStoreError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
