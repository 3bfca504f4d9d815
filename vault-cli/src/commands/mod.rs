//! CLI command implementations.

pub mod connect;
pub mod init;
pub mod notes;
pub mod safes;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vault_sync::{
    DirectoryCloudStorage, FileRepositoryStore, RepositoryStore, SettingsStore, StoreError,
    SyncContext, SyncService,
};
use vault_types::{NoteId, Repository};

use crate::config::{AppConfig, JsonSettingsStore, SETTINGS_FILE};
use crate::feedback::ConsoleFeedback;

/// Paths and stores of one data directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    data_dir: PathBuf,
    config: AppConfig,
}

impl Workspace {
    /// Workspace rooted at `data_dir`.
    pub fn new(data_dir: &Path, config: AppConfig) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            config,
        }
    }

    /// The application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Path of the local repository file.
    pub fn repository_path(&self) -> PathBuf {
        self.data_dir.join(&self.config.repository_file)
    }

    /// Path of the settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    /// The local repository store.
    pub fn repositories(&self) -> FileRepositoryStore {
        FileRepositoryStore::new(self.repository_path())
    }

    /// The settings store.
    pub fn settings(&self) -> JsonSettingsStore {
        JsonSettingsStore::new(self.settings_path(), self.config.initial_settings())
    }

    /// Whether `init` has run.
    pub fn is_initialized(&self) -> bool {
        self.repository_path().exists()
    }

    /// Load the local repository.
    pub async fn load_repository(&self) -> Result<Repository> {
        match self.repositories().load().await {
            Ok(repo) => Ok(repo),
            Err(StoreError::NotFound(_)) => {
                anyhow::bail!("No repository found. Run 'notevault init' first.")
            }
            Err(e) => Err(e).context("Failed to load repository"),
        }
    }

    /// Store the local repository.
    pub async fn save_repository(&self, repo: &Repository) -> Result<()> {
        self.repositories()
            .save(repo)
            .await
            .context("Failed to save repository")
    }

    /// Load the sync settings.
    pub async fn load_settings(&self) -> Result<vault_sync::Settings> {
        self.settings()
            .load()
            .await
            .context("Failed to load settings")
    }

    /// Sync service over the directory cloud and the local files.
    pub fn service(&self) -> SyncService {
        let ctx = SyncContext::new(
            Arc::new(DirectoryCloudStorage::new()),
            Arc::new(self.repositories()),
            Arc::new(self.settings()),
        )
        .with_cloud_file(self.config.cloud_file.clone());
        SyncService::new(ctx).with_feedback(Arc::new(ConsoleFeedback))
    }
}

/// Resolve a full note id or a unique prefix of one.
pub fn resolve_note_id(repo: &Repository, input: &str) -> Result<NoteId> {
    if let Ok(id) = input.parse::<NoteId>() {
        return Ok(id);
    }

    let prefix = input.to_ascii_lowercase();
    let mut matches = repo
        .notes
        .iter()
        .map(|n| n.id)
        .filter(|id| id.to_string().starts_with(&prefix));

    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (None, _) => anyhow::bail!("No note matches '{}'", input),
        (Some(_), Some(_)) => anyhow::bail!("'{}' matches several notes", input),
    }
}

/// Short display form of an id.
pub fn short_id(id: impl std::fmt::Display) -> String {
    id.to_string().chars().take(8).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::SafeCost;

    /// Workspace with fast KDF settings in `dir`.
    pub fn workspace(dir: &Path) -> Workspace {
        let config = AppConfig {
            kdf: "pbkdf2".to_string(),
            safe_cost: SafeCost::Low,
            compress: false,
            ..AppConfig::default()
        };
        Workspace::new(dir, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_types::Note;

    #[test]
    fn resolve_full_and_prefix_ids() {
        let mut repo = Repository::new();
        let note = Note::with_content("a");
        let id = note.id;
        repo.add_note(note);

        assert_eq!(resolve_note_id(&repo, &id.to_string()).unwrap(), id);
        assert_eq!(resolve_note_id(&repo, &short_id(id)).unwrap(), id);
        assert!(resolve_note_id(&repo, "zzzz").is_err());
    }

    #[test]
    fn ambiguous_prefix_is_rejected() {
        let mut repo = Repository::new();
        repo.add_note(Note::with_content("a"));
        repo.add_note(Note::with_content("b"));
        // The empty prefix matches every note.
        assert!(resolve_note_id(&repo, "").is_err());
    }

    #[tokio::test]
    async fn load_without_init_fails_with_hint() {
        let dir = tempfile::tempdir().unwrap();
        let ws = test_support::workspace(dir.path());
        assert!(!ws.is_initialized());
        let err = ws.load_repository().await.unwrap_err();
        assert!(err.to_string().contains("notevault init"));
    }
}
