//! Directory-backed cloud storage.
//!
//! Treats a local or mounted folder (a synced drive, a network share) as
//! the cloud. The folder is taken from [`CloudCredentials::location`].

use super::{CloudCredentials, CloudError, CloudStorage};
use crate::store::write_atomic;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Cloud storage on a filesystem directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryCloudStorage;

impl DirectoryCloudStorage {
    /// Create the storage.
    pub fn new() -> Self {
        Self
    }

    fn path_for(filename: &str, credentials: &CloudCredentials) -> Result<PathBuf, CloudError> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(CloudError::Transfer(format!(
                "invalid cloud file name: {filename:?}"
            )));
        }
        Ok(Path::new(&credentials.location).join(filename))
    }
}

#[async_trait]
impl CloudStorage for DirectoryCloudStorage {
    async fn exists(
        &self,
        filename: &str,
        credentials: &CloudCredentials,
    ) -> Result<bool, CloudError> {
        let path = Self::path_for(filename, credentials)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn download(
        &self,
        filename: &str,
        credentials: &CloudCredentials,
    ) -> Result<Vec<u8>, CloudError> {
        let path = Self::path_for(filename, credentials)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CloudError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn upload(
        &self,
        filename: &str,
        data: &[u8],
        credentials: &CloudCredentials,
    ) -> Result<(), CloudError> {
        let path = Self::path_for(filename, credentials)?;
        tokio::fs::create_dir_all(&credentials.location).await?;

        write_atomic(&path, data.to_vec()).await?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "uploaded to directory");
        Ok(())
    }
}
