//! Domain models for Smart Notes.
//!
//! - [`Note`]: a short title/content record owned by exactly one user. Notes
//!   live in the [`NOTES_COLLECTION`] of the document store and are always
//!   queried by owner.
//! - [`UserIdentity`]: the signed-in user, as returned by the identity
//!   provider. Its `uid` is the owner identifier stamped on every note.

mod note;
mod user;

pub use note::*;
pub use user::*;
