//! Post editor - the edit-in-place workflow.

use chrono::Utc;

use crate::context::Backend;
use crate::domain::draft::{EditDraft, LocalFile, PhotoPlan};
use crate::domain::post::{self, PhotoField, Post, PostUpdate};
use crate::error::Error;
use crate::service::best_effort_delete;
use crate::service::flight::{SingleFlight, SubmitState};

/// What a successful submit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The post document was updated.
    Updated,
    /// The draft described an unreachable photo state; nothing was sent.
    NoChange,
}

/// Edit session for one post. Holds the working draft; `submit`
/// commits it in a single document update.
pub struct PostEditor {
    backend: Backend,
    post: Post,
    draft: EditDraft,
    flight: SingleFlight,
}

impl PostEditor {
    /// Open an editor seeded from the stored post.
    pub fn open(backend: Backend, post: Post) -> Self {
        let draft = EditDraft::from_post(&post);
        Self {
            backend,
            post,
            draft,
            flight: SingleFlight::new(),
        }
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn draft(&self) -> &EditDraft {
        &self.draft
    }

    pub fn state(&self) -> SubmitState {
        self.flight.state()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft.set_text(text);
    }

    pub fn select_photo(&mut self, file: LocalFile) {
        self.draft.select_photo(file);
    }

    pub fn remove_photo(&mut self) {
        self.draft.remove_photo();
    }

    pub fn restore_photo(&mut self) {
        self.draft.restore_photo();
    }

    /// Commit the draft. Exactly one document update is issued per
    /// successful submit; blob deletes are best-effort and never block
    /// it. On failure the draft is kept, so the caller can retry.
    pub async fn submit(&self) -> Result<SubmitOutcome, Error> {
        let session = self
            .backend
            .identity
            .current_session()
            .await
            .ok_or(Error::SignedOut)?;
        if session.user_id != self.post.author_id {
            return Err(Error::NotAuthor);
        }
        post::validate_edit(self.draft.text(), self.draft.has_photo())?;
        let _permit = self.flight.begin()?;

        let photo = match self.draft.photo_plan() {
            PhotoPlan::Replace {
                file,
                delete_original,
            } => {
                let path = self.post.photo_path();
                if delete_original {
                    best_effort_delete(self.backend.blobs.as_ref(), &path, "photo replace").await;
                }
                let blob = self
                    .backend
                    .blobs
                    .upload(&path, file.bytes, &file.content_type)
                    .await?;
                PhotoField::Set(self.backend.blobs.public_url(&blob))
            }
            PhotoPlan::Remove => {
                best_effort_delete(
                    self.backend.blobs.as_ref(),
                    &self.post.photo_path(),
                    "photo removal",
                )
                .await;
                PhotoField::Clear
            }
            PhotoPlan::TextOnly => PhotoField::Keep,
            PhotoPlan::Inconsistent => {
                tracing::warn!(
                    post_id = %self.post.id,
                    "Displayed photo diverged from the original with no file selected; dropping submit"
                );
                return Ok(SubmitOutcome::NoChange);
            }
        };

        let update = PostUpdate {
            text: self.draft.text().to_string(),
            photo,
            updated_at: Utc::now().timestamp_millis(),
        };
        self.backend
            .docs
            .update(post::COLLECTION, &self.post.id.0, update.into_fields())
            .await?;
        tracing::info!(post_id = %self.post.id, "Post updated");
        Ok(SubmitOutcome::Updated)
    }
}
