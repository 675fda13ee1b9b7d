//! Post removal - confirmed delete with photo cleanup.

use crate::context::Backend;
use crate::domain::Post;
use crate::domain::post;
use crate::error::Error;
use crate::ports::Confirmer;
use crate::service::best_effort_delete;
use crate::service::flight::SingleFlight;

/// Deletes posts, asking first.
pub struct PostRemover {
    backend: Backend,
    flight: SingleFlight,
}

impl PostRemover {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            flight: SingleFlight::new(),
        }
    }

    /// Delete a post after confirmation. Returns `false` when the user
    /// declines; nothing has been sent to the backend in that case.
    pub async fn delete(&self, confirmer: &dyn Confirmer, post: &Post) -> Result<bool, Error> {
        let session = self
            .backend
            .identity
            .current_session()
            .await
            .ok_or(Error::SignedOut)?;
        if session.user_id != post.author_id {
            return Err(Error::NotAuthor);
        }

        if !confirmer
            .confirm("Are you sure you want to delete this post?")
            .await
        {
            tracing::debug!(post_id = %post.id, "Delete declined");
            return Ok(false);
        }
        let _permit = self.flight.begin()?;

        self.backend.docs.delete(post::COLLECTION, &post.id.0).await?;
        if post.photo_url.is_some() {
            best_effort_delete(
                self.backend.blobs.as_ref(),
                &post.photo_path(),
                "post delete",
            )
            .await;
        }
        tracing::info!(post_id = %post.id, "Post deleted");
        Ok(true)
    }
}
