//! Post composer - the create-post workflow.

use chrono::Utc;
use serde_json::{Map, json};

use crate::context::Backend;
use crate::domain::post::{self, Post, field};
use crate::domain::{LocalFile, PostId, Session};
use crate::error::Error;
use crate::service::flight::{SingleFlight, SubmitState};

/// Builds new posts. The optional photo is uploaded after the document
/// exists, so the storage path can embed the post id.
pub struct PostComposer {
    backend: Backend,
    flight: SingleFlight,
}

impl PostComposer {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            flight: SingleFlight::new(),
        }
    }

    pub fn state(&self) -> SubmitState {
        self.flight.state()
    }

    /// Create a post. When photo attachment fails the document is kept
    /// without its photo and `Error::PhotoUpload` carries the id.
    pub async fn compose(&self, text: &str, photo: Option<LocalFile>) -> Result<PostId, Error> {
        let author = self
            .backend
            .identity
            .current_session()
            .await
            .ok_or(Error::SignedOut)?;
        post::validate_compose_text(text)?;
        let _permit = self.flight.begin()?;

        let created_at = Utc::now().timestamp_millis();
        let fields = Post::creation_fields(&author, text, created_at);
        let id = PostId(self.backend.docs.create(post::COLLECTION, fields).await?);
        tracing::info!(post_id = %id, "Post created");

        if let Some(file) = photo {
            if let Err(e) = self.attach_photo(&author, &id, file).await {
                tracing::error!(post_id = %id, error = %e, "Photo attachment failed; post kept without photo");
                return Err(Error::PhotoUpload {
                    post_id: id,
                    reason: e.to_string(),
                });
            }
        }
        Ok(id)
    }

    async fn attach_photo(
        &self,
        author: &Session,
        id: &PostId,
        file: LocalFile,
    ) -> Result<(), Error> {
        let path = post::photo_path(&author.user_id, id);
        let blob = self
            .backend
            .blobs
            .upload(&path, file.bytes, &file.content_type)
            .await?;
        let url = self.backend.blobs.public_url(&blob);

        let mut patch = Map::new();
        patch.insert(field::PHOTO_URL.into(), json!(url));
        self.backend.docs.update(post::COLLECTION, &id.0, patch).await?;
        tracing::debug!(post_id = %id, url = %url, "Photo attached");
        Ok(())
    }
}
