//! Binary object storage for photos, scans, and signed artifacts.
//!
//! The hosted object store behind avatars, logos, and signed documents
//! is an external collaborator; this trait is the seam. Keys are
//! opaque, slash-delimited paths (`agreements/{id}/photo`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::StorageError;

/// A stored binary object with its content type.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Binary object upload/download.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store a blob under `key`, replacing any previous content.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    /// Fetch a blob. Returns `Err(StorageError::BlobNotFound)` if absent.
    async fn get(&self, key: &str) -> Result<StoredBlob, StorageError>;

    /// Whether a blob exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// In-memory blob store for tests and the offline runner.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, StoredBlob>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|e| StorageError::Backend(format!("lock poisoned: {e}")))?;
        blobs.insert(
            key.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredBlob, StorageError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|e| StorageError::Backend(format!("lock poisoned: {e}")))?;
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::BlobNotFound {
                key: key.to_string(),
            })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|e| StorageError::Backend(format!("lock poisoned: {e}")))?;
        Ok(blobs.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_round_trip() {
        let store = MemoryBlobStore::new();
        store
            .put("agreements/a1/photo", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();
        let blob = store.get("agreements/a1/photo").await.unwrap();
        assert_eq!(blob.bytes, vec![1, 2, 3]);
        assert_eq!(blob.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn missing_key_is_blob_not_found() {
        let store = MemoryBlobStore::new();
        let err = store.get("nope").await.unwrap_err();
        assert!(matches!(err, StorageError::BlobNotFound { .. }));
        assert!(!store.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn put_replaces_previous_content() {
        let store = MemoryBlobStore::new();
        store.put("k", vec![1], "image/png").await.unwrap();
        store.put("k", vec![2, 2], "image/jpeg").await.unwrap();
        let blob = store.get("k").await.unwrap();
        assert_eq!(blob.bytes, vec![2, 2]);
        assert_eq!(blob.content_type, "image/jpeg");
    }
}
