//! Remote blob store.
//!
//! Objects upload to `/storage/v1/object/{path}` with `x-upsert` so a
//! reused path overwrites in place. The public URL carries a revision
//! minted per upload, so a re-upload at the same path yields a new URL.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use uuid::Uuid;

use finch_core::ports::{BlobError, BlobRef, BlobStore};

use crate::remote::{RemoteConfig, TokenCell};

/// Blob store backed by the remote storage API.
pub struct RemoteBlobs {
    config: RemoteConfig,
    http: reqwest::Client,
    token: TokenCell,
}

impl RemoteBlobs {
    pub fn new(config: RemoteConfig, http: reqwest::Client, token: TokenCell) -> Self {
        Self {
            config,
            http,
            token,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}", self.config.base_url, path)
    }

    async fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("apikey", &self.config.api_key);
        match self.token.read().await.as_ref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl BlobStore for RemoteBlobs {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<BlobRef, BlobError> {
        let request = self
            .http
            .post(self.object_url(path))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes);
        let response = self
            .apply_auth(request)
            .await
            .send()
            .await
            .map_err(|e| BlobError::Connection(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlobError::Upload(format!("{status}: {body}")));
        }

        tracing::debug!(path, "Object uploaded");
        Ok(BlobRef {
            path: path.to_string(),
            revision: Uuid::new_v4().to_string(),
        })
    }

    fn public_url(&self, blob: &BlobRef) -> String {
        format!(
            "{}/storage/v1/object/public/{}?rev={}",
            self.config.base_url, blob.path, blob.revision
        )
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        let request = self.http.delete(self.object_url(path));
        let response = self
            .apply_auth(request)
            .await
            .send()
            .await
            .map_err(|e| BlobError::Connection(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlobError::Delete(format!("{status}: {body}")));
        }

        tracing::debug!(path, "Object deleted");
        Ok(())
    }
}
