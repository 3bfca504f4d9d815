//! # vault-sync
//!
//! Synchronization protocol for NoteVault repositories.
//!
//! A local repository is mirrored to a cloud storage as a single encrypted
//! file. Every device decrypts it with the shared transfer code, merges it
//! with its local copy and uploads the result.
//!
//! ## Features
//!
//! - **Full sync**: [`SyncStory`] creates, downloads, decrypts, compares and
//!   merges the cloud repository
//! - **Note transfer**: [`NoteTransferStory`] pulls or pushes a single note
//! - **Policies**: the same steps run interactively or in the background
//!   ([`SyncPolicy`])
//! - **Pluggable collaborators**: [`CloudStorage`], [`RepositoryStore`],
//!   [`SettingsStore`], [`TextCatalog`] and [`vault_core::Feedback`], with
//!   in-memory implementations for tests
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vault_sync::{SyncContext, SyncRequest, SyncService, DirectoryCloudStorage,
//!                  FileRepositoryStore, MemorySettingsStore};
//!
//! let ctx = SyncContext::new(
//!     Arc::new(DirectoryCloudStorage::new()),
//!     Arc::new(FileRepositoryStore::new("repository.json")),
//!     Arc::new(MemorySettingsStore::new()),
//! );
//! let service = SyncService::new(ctx);
//! let outcome = service.synchronize(SyncRequest::default(), UiMode::Gui).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cloud;
pub mod error;
pub mod gate;
pub mod note_transfer;
pub mod service;
pub mod settings;
pub mod steps;
pub mod store;
pub mod sync_story;
pub mod text;
pub mod transfer_code;

pub use cloud::{
    CloudCredentials, CloudError, CloudStorage, DirectoryCloudStorage, MockCloudStorage,
    OAuthToken,
};
pub use error::SyncError;
pub use gate::{SyncGate, SyncGuard};
pub use note_transfer::{NoteTransferModel, NoteTransferStep, NoteTransferStory};
pub use service::SyncService;
pub use settings::{MemorySettingsStore, Settings, SettingsStore};
pub use steps::{CloudCheck, CloudSession, SyncContext, DEFAULT_CLOUD_FILE};
pub use store::{
    write_atomic, FileRepositoryStore, MemoryRepositoryStore, RepositoryStore, StoreError,
};
pub use sync_story::{
    RepositoryChoice, SyncModel, SyncOutcome, SyncPolicy, SyncRequest, SyncStep, SyncStory,
};
pub use text::{EnglishCatalog, TextCatalog, TextKey};
pub use transfer_code::{
    format_transfer_code, generate_transfer_code, normalize_transfer_code, TRANSFER_CODE_LENGTH,
};
