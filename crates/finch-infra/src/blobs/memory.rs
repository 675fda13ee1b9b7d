//! In-memory blob store.
//!
//! Objects are keyed by path; each upload mints a fresh revision so
//! the public URL changes whenever a path is re-uploaded.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use finch_core::ports::{BlobError, BlobRef, BlobStore};

struct StoredBlob {
    content_type: String,
    bytes: Vec<u8>,
}

/// In-memory blob store using a path-keyed map.
pub struct MemoryBlobs {
    store: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobs {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    /// True when an object currently exists at `path`.
    pub async fn contains(&self, path: &str) -> bool {
        self.store.read().await.contains_key(path)
    }

    /// Content type and bytes of the object at `path`, if any.
    pub async fn read(&self, path: &str) -> Option<(String, Vec<u8>)> {
        self.store
            .read()
            .await
            .get(path)
            .map(|blob| (blob.content_type.clone(), blob.bytes.clone()))
    }
}

impl Default for MemoryBlobs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<BlobRef, BlobError> {
        let revision = Uuid::new_v4().to_string();
        let mut store = self.store.write().await;
        store.insert(
            path.to_string(),
            StoredBlob {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        drop(store);

        tracing::debug!(path = %path, "Blob stored");
        Ok(BlobRef {
            path: path.to_string(),
            revision,
        })
    }

    fn public_url(&self, blob: &BlobRef) -> String {
        format!("memory://{}?rev={}", blob.path, blob.revision)
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        let mut store = self.store.write().await;
        store.remove(path).ok_or(BlobError::NotFound)?;
        tracing::debug!(path = %path, "Blob deleted");
        Ok(())
    }
}
