//! Backend context - the collaborator set every workflow receives.

use std::sync::Arc;

use crate::ports::{BlobStore, DocumentStore, IdentityProvider};

/// One handle to the whole backend. Workflows never reach for a global;
/// they are handed this and talk only to its ports.
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityProvider>,
    pub docs: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Backend {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        docs: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            identity,
            docs,
            blobs,
        }
    }
}
