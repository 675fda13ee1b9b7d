//! Profile editing - display name and avatar.

use crate::context::Backend;
use crate::domain::{LocalFile, Session};
use crate::error::{Error, ValidationError};
use crate::ports::ProfileUpdate;
use crate::service::flight::SingleFlight;

/// Edits the signed-in user's profile.
pub struct ProfileEditor {
    backend: Backend,
    flight: SingleFlight,
}

impl ProfileEditor {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            flight: SingleFlight::new(),
        }
    }

    /// Change the display name. Submitting the current name verbatim
    /// is a no-op that never reaches the provider.
    pub async fn rename(&self, new_name: &str) -> Result<Session, Error> {
        let session = self
            .backend
            .identity
            .current_session()
            .await
            .ok_or(Error::SignedOut)?;
        if new_name.is_empty() {
            return Err(ValidationError::EmptyDisplayName.into());
        }
        if session.display_name.as_deref() == Some(new_name) {
            tracing::debug!(user_id = %session.user_id, "Display name unchanged; skipping update");
            return Ok(session);
        }
        let _permit = self.flight.begin()?;

        let update = ProfileUpdate {
            display_name: Some(new_name.to_string()),
            avatar_url: None,
        };
        let session = self.backend.identity.update_profile(update).await?;
        tracing::info!(user_id = %session.user_id, "Display name updated");
        Ok(session)
    }

    /// Upload a new avatar and point the profile at it. The avatar
    /// path is per-user, so the upload replaces the previous object.
    pub async fn set_avatar(&self, file: LocalFile) -> Result<Session, Error> {
        let session = self
            .backend
            .identity
            .current_session()
            .await
            .ok_or(Error::SignedOut)?;
        let _permit = self.flight.begin()?;

        let path = session.avatar_path();
        let blob = self
            .backend
            .blobs
            .upload(&path, file.bytes, &file.content_type)
            .await?;
        let url = self.backend.blobs.public_url(&blob);

        let update = ProfileUpdate {
            display_name: None,
            avatar_url: Some(url),
        };
        let session = self.backend.identity.update_profile(update).await?;
        tracing::info!(user_id = %session.user_id, "Avatar updated");
        Ok(session)
    }
}
