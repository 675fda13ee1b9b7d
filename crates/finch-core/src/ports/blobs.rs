//! Blob storage port - abstraction over the binary object backend.

use async_trait::async_trait;

/// A stored object plus the revision minted for this upload. Revisions
/// make the public URL change whenever the same path is re-uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobRef {
    pub path: String,
    pub revision: String,
}

/// Blob store trait - upload, resolve and delete binary objects.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` at `path`, replacing any object already there.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<BlobRef, BlobError>;

    /// Publicly fetchable URL for an uploaded object. Distinct per
    /// upload even when the path is reused.
    fn public_url(&self, blob: &BlobRef) -> String;

    /// Delete the object at `path`.
    async fn delete(&self, path: &str) -> Result<(), BlobError>;
}

/// Blob store errors.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Delete failed: {0}")]
    Delete(String),

    #[error("Object not found")]
    NotFound,

    #[error("Connection error: {0}")]
    Connection(String),
}
