//! # Finch Core
//!
//! The domain layer of the Finch posting client.
//! This crate contains the posting workflows with zero backend wiring;
//! everything observable happens through the ports.

pub mod context;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use context::Backend;
pub use error::{Error, ValidationError};
