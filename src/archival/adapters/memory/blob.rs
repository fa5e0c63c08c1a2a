//! In-memory blob store for archival tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{Arc, RwLock};

use crate::archival::ports::{BlobStore, BlobStoreError, BlobStoreResult};

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

/// Thread-safe blob store keeping objects in an ordered map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    objects: Arc<RwLock<BTreeMap<String, StoredBlob>>>,
}

fn lock_error(err: impl std::fmt::Display) -> BlobStoreError {
    BlobStoreError::backend(std::io::Error::other(err.to_string()))
}

impl InMemoryBlobStore {
    /// Creates an empty blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the content type recorded for `name`, if the object exists.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Backend`] when the object map lock is
    /// poisoned.
    pub fn content_type(&self, name: &str) -> BlobStoreResult<Option<String>> {
        let objects = self.objects.read().map_err(lock_error)?;
        Ok(objects.get(name).map(|blob| blob.content_type.clone()))
    }

    /// Returns the number of stored objects.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Backend`] when the object map lock is
    /// poisoned.
    pub fn len(&self) -> BlobStoreResult<usize> {
        Ok(self.objects.read().map_err(lock_error)?.len())
    }

    /// Returns `true` when no object is stored.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Backend`] when the object map lock is
    /// poisoned.
    pub fn is_empty(&self) -> BlobStoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> BlobStoreResult<()> {
        let mut objects = self.objects.write().map_err(lock_error)?;
        match objects.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(BlobStoreError::AlreadyExists(name.to_owned())),
            Entry::Vacant(slot) => {
                slot.insert(StoredBlob {
                    bytes,
                    content_type: content_type.to_owned(),
                });
                Ok(())
            }
        }
    }

    async fn download(&self, name: &str) -> BlobStoreResult<Vec<u8>> {
        let objects = self.objects.read().map_err(lock_error)?;
        objects
            .get(name)
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| BlobStoreError::NotFound(name.to_owned()))
    }

    async fn list(&self, prefix: &str) -> BlobStoreResult<Vec<String>> {
        let objects = self.objects.read().map_err(lock_error)?;
        Ok(objects
            .range(prefix.to_owned()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn delete(&self, name: &str) -> BlobStoreResult<()> {
        self.objects.write().map_err(lock_error)?.remove(name);
        Ok(())
    }

    async fn exists(&self, name: &str) -> BlobStoreResult<bool> {
        Ok(self.objects.read().map_err(lock_error)?.contains_key(name))
    }
}
