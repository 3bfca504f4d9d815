//! Local repository storage.
//!
//! The repository file is the only durable state a sync writes locally.
//! Saves replace the file atomically so a crash never leaves a partially
//! written repository behind.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use vault_types::{ModelError, Repository};

/// Local storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No repository has been stored yet.
    #[error("no repository at {0}")]
    NotFound(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The repository could not be encoded or decoded.
    #[error("repository format error: {0}")]
    Model(#[from] ModelError),

    /// Settings could not be encoded or decoded.
    #[error("settings format error: {0}")]
    Settings(String),
}

/// Where the local repository is loaded from and saved to.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Load the current local repository.
    async fn load(&self) -> Result<Repository, StoreError>;

    /// Replace the local repository atomically.
    async fn save(&self, repo: &Repository) -> Result<(), StoreError>;
}

/// Repository stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileRepositoryStore {
    path: PathBuf,
}

impl FileRepositoryStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The repository file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Replace the file at `path` with `bytes`.
///
/// Writes a uniquely named temporary file in the same directory, flushes it
/// to disk and renames it over `path`. Concurrent writers never share a
/// temporary file, and readers see either the old or the new contents. On
/// Unix the new file is readable by its owner only.
pub async fn write_atomic(path: &Path, bytes: Vec<u8>) -> std::io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)?
}

#[async_trait]
impl RepositoryStore for FileRepositoryStore {
    async fn load(&self) -> Result<Repository, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Repository::from_json_bytes(&bytes)?)
    }

    async fn save(&self, repo: &Repository) -> Result<(), StoreError> {
        let bytes = repo.to_json_bytes()?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        write_atomic(&self.path, bytes).await?;
        tracing::info!(path = %self.path.display(), notes = repo.notes.len(), "stored repository");
        Ok(())
    }
}

/// In-memory repository store for testing.
#[derive(Debug, Default)]
pub struct MemoryRepositoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    repo: Option<Repository>,
    saves: usize,
    fail_next_save: Option<String>,
}

impl MemoryRepositoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `repo`.
    pub fn with_repository(repo: Repository) -> Self {
        let store = Self::new();
        store.set(repo);
        store
    }

    /// Replace the stored repository without counting a save.
    pub fn set(&self, repo: Repository) {
        let mut inner = self.inner.lock().unwrap();
        inner.repo = Some(repo);
    }

    /// The stored repository.
    pub fn get(&self) -> Option<Repository> {
        let inner = self.inner.lock().unwrap();
        inner.repo.clone()
    }

    /// Number of saves so far.
    pub fn save_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.saves
    }

    /// Cause the next save() to fail with the given error.
    pub fn fail_next_save(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_save = Some(error.to_string());
    }
}

impl Clone for MemoryRepositoryStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl RepositoryStore for MemoryRepositoryStore {
    async fn load(&self) -> Result<Repository, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .repo
            .clone()
            .ok_or_else(|| StoreError::NotFound("memory".into()))
    }

    async fn save(&self, repo: &Repository) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_save.take() {
            return Err(StoreError::Io(std::io::Error::other(error)));
        }
        inner.repo = Some(repo.clone());
        inner.saves += 1;
        Ok(())
    }
}
