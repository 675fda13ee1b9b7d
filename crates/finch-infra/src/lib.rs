//! # Finch Infrastructure
//!
//! Concrete implementations of the ports defined in `finch-core`.
//! This crate contains the in-memory backend and the remote REST backend.
//!
//! ## Feature Flags
//!
//! - `remote` (default) - remote REST backend via reqwest

use std::sync::Arc;

use finch_core::Backend;

pub mod blobs;
pub mod docs;
pub mod identity;

#[cfg(feature = "remote")]
pub mod remote;

// Re-exports - In-Memory
pub use blobs::MemoryBlobs;
pub use docs::MemoryDocs;
pub use identity::{MemoryIdentity, ThrottleConfig};

// Re-exports - Remote
#[cfg(feature = "remote")]
pub use blobs::RemoteBlobs;
#[cfg(feature = "remote")]
pub use docs::RemoteDocs;
#[cfg(feature = "remote")]
pub use identity::RemoteIdentity;
#[cfg(feature = "remote")]
pub use remote::{ConnectError, RemoteConfig, connect};

/// Wire a complete in-memory backend. Data lives for the process only.
pub fn memory_backend() -> Backend {
    Backend::new(
        Arc::new(MemoryIdentity::default()),
        Arc::new(MemoryDocs::default()),
        Arc::new(MemoryBlobs::default()),
    )
}

#[cfg(test)]
mod tests;
