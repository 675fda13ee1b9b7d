//! Blob stores - in-memory objects and the remote storage API.

mod memory;

pub use memory::MemoryBlobs;

#[cfg(feature = "remote")]
mod remote;

#[cfg(feature = "remote")]
pub use remote::RemoteBlobs;
