//! Workflow-level error types.

use thiserror::Error;

use crate::domain::PostId;
use crate::ports::{AuthError, BlobError, StoreError};

/// Validation failures, raised before anything is sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Post text must not be empty")]
    EmptyText,

    #[error("Post text must be at most {max} characters")]
    TextTooLong { max: usize },

    #[error("A post needs text or a photo")]
    EmptyPost,

    #[error("All fields are required")]
    MissingFields,

    #[error("Display name must not be empty")]
    EmptyDisplayName,
}

/// Errors the posting workflows return.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Storage error: {0}")]
    Blob(#[from] BlobError),

    #[error("Not signed in")]
    SignedOut,

    #[error("Only the author may modify this post")]
    NotAuthor,

    #[error("Another submit is already in flight")]
    Busy,

    /// Partial compose failure: the document exists, the photo does not.
    #[error("Post {post_id} was created but its photo could not be attached: {reason}")]
    PhotoUpload { post_id: PostId, reason: String },
}
