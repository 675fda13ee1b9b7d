//! Application services - the workflow behind each screen action.

mod composer;
mod editor;
mod feed;
mod flight;
mod profile;
mod remove;
mod session;

pub use composer::PostComposer;
pub use editor::{PostEditor, SubmitOutcome};
pub use feed::{FeedHandle, LiveFeed, PAGE_SIZE};
pub use flight::{FlightPermit, SingleFlight, SubmitState};
pub use profile::ProfileEditor;
pub use remove::PostRemover;
pub use session::SessionGate;

use crate::ports::BlobStore;

/// Delete a blob without letting failure reach the caller. Blob
/// cleanup never blocks a workflow; errors are logged and swallowed.
pub(crate) async fn best_effort_delete(blobs: &dyn BlobStore, path: &str, during: &'static str) {
    if let Err(e) = blobs.delete(path).await {
        tracing::warn!(path = %path, during = during, error = %e, "Blob delete failed; continuing");
    }
}
