//! Domain entities - the core business objects.

pub mod draft;
pub mod post;
pub mod session;

pub use draft::{EditDraft, LocalFile, PhotoPlan};
pub use post::{Post, PostId};
pub use session::{Session, UserId};
