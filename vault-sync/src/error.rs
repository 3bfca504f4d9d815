//! Error types for synchronization.

use thiserror::Error;
use vault_crypto::CryptoError;
use vault_types::{ModelError, NoteId};

use crate::cloud::CloudError;
use crate::store::StoreError;
use crate::text::TextKey;

/// Synchronization errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Encryption or decryption failed. Never retried.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// No cloud storage or transfer code is set up yet.
    #[error("a full sync must set up cloud storage first")]
    MustSyncFullyFirst,

    /// None of the known transfer codes decrypts the cloud repository.
    #[error("the cloud repository must be synchronized first")]
    MustSyncFirst,

    /// Local and cloud repositories have different identities.
    #[error("local and cloud repositories differ")]
    RepositoryMismatch,

    /// The targeted note is missing on one side.
    #[error("note not found: {0}")]
    NoteNotFound(NoteId),

    /// Cloud storage failed.
    #[error("cloud error: {0}")]
    Cloud(#[from] CloudError),

    /// Local storage failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The repository could not be encoded or decoded.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Another sync holds the gate.
    #[error("a synchronization is already running")]
    AlreadyRunning,

    /// A step reached a state the protocol never produces.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Text shown to the user for this error.
    pub fn text_key(&self) -> TextKey {
        match self {
            Self::Crypto(_) => TextKey::CryptoFailure,
            Self::MustSyncFullyFirst => TextKey::MustSyncFullyFirst,
            Self::MustSyncFirst => TextKey::MustSyncFirst,
            Self::RepositoryMismatch => TextKey::RepositoryMismatch,
            Self::NoteNotFound(_) => TextKey::NoteNotFound,
            Self::Cloud(_) => TextKey::CloudFailure,
            Self::Store(_) | Self::Model(_) => TextKey::StoreFailure,
            Self::AlreadyRunning => TextKey::AlreadyRunning,
            Self::Internal(_) => TextKey::InternalFailure,
        }
    }

    /// Whether the failure comes from the environment and the text should
    /// carry the technical detail.
    pub fn has_detail(&self) -> bool {
        matches!(
            self,
            Self::Crypto(_) | Self::Cloud(_) | Self::Store(_) | Self::Model(_) | Self::Internal(_)
        )
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(e.to_string())
    }
}
