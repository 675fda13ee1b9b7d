//! Ports - trait definitions for the backend services.
//! These are the "interfaces" that adapters must implement.

mod blobs;
mod confirm;
mod docs;
mod identity;

pub use blobs::{BlobError, BlobRef, BlobStore};
pub use confirm::{AutoConfirm, Confirmer};
pub use docs::{
    Direction, Document, DocumentStore, Fields, Query, SnapshotHandler, StoreError, Subscription,
};
pub use identity::{AuthError, IdentityProvider, MIN_PASSWORD_LEN, ProfileUpdate};
