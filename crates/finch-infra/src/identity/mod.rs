//! Identity providers - in-memory accounts and the remote auth API.

mod memory;

pub use memory::{MemoryIdentity, ThrottleConfig};

#[cfg(feature = "remote")]
mod remote;

#[cfg(feature = "remote")]
pub use remote::RemoteIdentity;
