//! # vault-core
//!
//! Pure logic for NoteVault (no network or disk I/O).
//!
//! - [`story`]: the step-chain engine that drives every synchronization
//!   protocol, with typed models and UI-mode aware feedback
//! - [`merge`]: comparison and merging of two repository snapshots
//! - [`safes`]: opening, closing and using safes to encrypt notes
//!
//! The actual I/O (cloud transfers, repository files) is performed by
//! `vault-sync`, whose steps call into these modules.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod merge;
pub mod safes;
pub mod story;

pub use merge::{
    merge_repositories, merge_single_note, merge_single_note_at, modification_fingerprint,
    same_repository, MergeDirection, MergeError, NoteMergeOutcome,
};
pub use safes::{
    create_safe, decrypt_note, encrypt_note, open_safe, open_safes, SafeError,
};
pub use story::{
    run_chain, ChainOutcome, Feedback, FeedbackEvent, NoFeedback, RecordingFeedback, StepResult,
    Story, UiMode,
};
