//! Document stores - in-memory collections and the remote REST API.

mod memory;

pub use memory::MemoryDocs;

#[cfg(feature = "remote")]
mod remote;

#[cfg(feature = "remote")]
pub use remote::RemoteDocs;
