//! Cloud storage abstraction.
//!
//! The synchronization protocol only needs three operations on a single
//! named file: check whether it exists, download it, upload it. Providers
//! that authenticate with OAuth may additionally refresh an expired token.
//!
//! # Example
//!
//! ```ignore
//! let cloud = MockCloudStorage::new();
//! let credentials = CloudCredentials::new("mock://notes");
//! cloud.upload("repo.bin", b"packed", &credentials).await?;
//! assert!(cloud.exists("repo.bin", &credentials).await?);
//! ```

mod directory;
mod mock;

pub use directory::DirectoryCloudStorage;
pub use mock::MockCloudStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cloud storage errors.
#[derive(Debug, Error)]
pub enum CloudError {
    /// The file does not exist.
    #[error("cloud file not found: {0}")]
    NotFound(String),

    /// The credentials were rejected.
    #[error("cloud storage rejected the credentials")]
    Unauthorized,

    /// Local I/O on a directory-backed cloud failed.
    #[error("cloud I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other provider failure.
    #[error("cloud transfer failed: {0}")]
    Transfer(String),
}

/// OAuth access token with its refresh token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    /// Bearer token.
    pub access_token: String,
    /// Token used to obtain a new access token.
    pub refresh_token: String,
    /// Expiry of the access token, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthToken {
    /// Whether the access token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// Don't leak tokens in debug output
impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Where the cloud repository lives and how to authenticate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudCredentials {
    /// Provider-specific location (URL, folder path).
    pub location: String,
    /// Optional user name for basic authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Optional password for basic authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Optional OAuth token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<OAuthToken>,
}

impl CloudCredentials {
    /// Credentials pointing at `location` without authentication.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            username: None,
            password: None,
            token: None,
        }
    }

    /// Attach an OAuth token.
    pub fn with_token(mut self, token: OAuthToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Whether an OAuth token is present and expired at `now`.
    pub fn needs_token_refresh(&self, now: DateTime<Utc>) -> bool {
        self.token.as_ref().is_some_and(|t| t.is_expired_at(now))
    }
}

// Don't leak passwords in debug output
impl std::fmt::Debug for CloudCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudCredentials")
            .field("location", &self.location)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("token", &self.token)
            .finish()
    }
}

/// A cloud storage provider holding the encrypted repository file.
#[async_trait]
pub trait CloudStorage: Send + Sync {
    /// Whether `filename` exists.
    async fn exists(
        &self,
        filename: &str,
        credentials: &CloudCredentials,
    ) -> Result<bool, CloudError>;

    /// Download `filename`.
    async fn download(
        &self,
        filename: &str,
        credentials: &CloudCredentials,
    ) -> Result<Vec<u8>, CloudError>;

    /// Upload `data` as `filename`, replacing any previous content.
    async fn upload(
        &self,
        filename: &str,
        data: &[u8],
        credentials: &CloudCredentials,
    ) -> Result<(), CloudError>;

    /// Obtain a fresh OAuth token. Providers without OAuth return `None`.
    async fn refresh_token(
        &self,
        _credentials: &CloudCredentials,
    ) -> Result<Option<OAuthToken>, CloudError> {
        Ok(None)
    }
}
