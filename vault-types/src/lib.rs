//! # vault-types
//!
//! Data model shared by all NoteVault crates:
//! - [`Repository`] - the full collection of notes, tombstones and safes
//! - [`Note`] - a single note with its modification timestamps
//! - [`Safe`] - an encrypted key container referenced by notes
//! - [`NoteId`], [`RepositoryId`], [`SafeId`] - stable UUID identities
//! - [`ModelError`] - error types
//!
//! Repositories are loaded and saved wholesale through the JSON codec on
//! [`Repository`]. Nothing in this crate performs I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod note;
mod repository;
mod safe;

pub use error::ModelError;
pub use ids::{NoteId, RepositoryId, SafeId};
pub use note::Note;
pub use repository::{Repository, CURRENT_REVISION};
pub use safe::Safe;
