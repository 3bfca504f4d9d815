//! Steps shared by every synchronization story.
//!
//! Both the full sync and the single-note transfer start the same way:
//! check the cloud, download, decrypt with the known transfer codes. The
//! shared state for those steps lives in [`CloudSession`], embedded in each
//! story's model.

use std::sync::Arc;
use vault_crypto::{decrypt, encrypt, CryptoError, Secret};
use vault_types::Repository;
use zeroize::Zeroizing;

use crate::cloud::{CloudCredentials, CloudStorage};
use crate::error::SyncError;
use crate::settings::{Settings, SettingsStore};
use crate::store::RepositoryStore;
use crate::text::{EnglishCatalog, TextCatalog, TextKey};

/// Default name of the repository file in the cloud.
pub const DEFAULT_CLOUD_FILE: &str = "notevault_repository.bin";

/// Collaborators every story needs.
#[derive(Clone)]
pub struct SyncContext {
    /// Cloud storage provider.
    pub cloud: Arc<dyn CloudStorage>,
    /// Local repository storage.
    pub repositories: Arc<dyn RepositoryStore>,
    /// Settings storage.
    pub settings: Arc<dyn SettingsStore>,
    /// User-facing texts.
    pub catalog: Arc<dyn TextCatalog>,
    /// Repository file name in the cloud.
    pub cloud_file: String,
}

impl SyncContext {
    /// Context with the English catalog and the default cloud file name.
    pub fn new(
        cloud: Arc<dyn CloudStorage>,
        repositories: Arc<dyn RepositoryStore>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            cloud,
            repositories,
            settings,
            catalog: Arc::new(EnglishCatalog),
            cloud_file: DEFAULT_CLOUD_FILE.to_string(),
        }
    }

    /// Use a different text catalog.
    pub fn with_catalog(mut self, catalog: Arc<dyn TextCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Use a different cloud file name.
    pub fn with_cloud_file(mut self, name: impl Into<String>) -> Self {
        self.cloud_file = name.into();
        self
    }

    /// Text for `key`.
    pub fn text(&self, key: TextKey) -> String {
        self.catalog.text(key)
    }

    /// Text describing `error`, with technical detail where it helps.
    pub fn describe(&self, error: &SyncError) -> String {
        let text = self.text(error.text_key());
        if error.has_detail() {
            format!("{text} ({error})")
        } else {
            text
        }
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("cloud_file", &self.cloud_file)
            .finish_non_exhaustive()
    }
}

/// State of the cloud side while a story runs.
#[derive(Debug, Default)]
pub struct CloudSession {
    /// Settings loaded at the start of the story.
    pub settings: Settings,
    /// Raw download.
    pub cloud_bytes: Option<Vec<u8>>,
    /// Decrypted cloud repository.
    pub cloud_repository: Option<Repository>,
}

/// Result of looking for the cloud repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudCheck {
    /// No cloud storage configured.
    NotConfigured,
    /// Configured, but no repository file yet.
    Missing,
    /// Repository file present.
    Present,
}

impl CloudSession {
    /// Configured credentials.
    pub fn credentials(&self) -> Result<&CloudCredentials, SyncError> {
        self.settings
            .cloud
            .as_ref()
            .ok_or(SyncError::MustSyncFullyFirst)
    }

    /// Load settings, refresh an expired token and look for the cloud file.
    pub async fn check_cloud(&mut self, ctx: &SyncContext) -> Result<CloudCheck, SyncError> {
        self.settings = ctx.settings.load().await?;
        let Some(credentials) = self.settings.cloud.clone() else {
            return Ok(CloudCheck::NotConfigured);
        };

        if credentials.needs_token_refresh(chrono::Utc::now()) {
            if let Some(token) = ctx.cloud.refresh_token(&credentials).await? {
                tracing::debug!("refreshed cloud token");
                if let Some(cloud) = self.settings.cloud.as_mut() {
                    cloud.token = Some(token);
                }
                ctx.settings.save(&self.settings).await?;
            }
        }

        let credentials = self.credentials()?;
        if ctx.cloud.exists(&ctx.cloud_file, credentials).await? {
            Ok(CloudCheck::Present)
        } else {
            Ok(CloudCheck::Missing)
        }
    }

    /// Download the cloud repository file.
    pub async fn download(&mut self, ctx: &SyncContext) -> Result<(), SyncError> {
        let bytes = ctx
            .cloud
            .download(&ctx.cloud_file, self.credentials()?)
            .await?;
        tracing::debug!(bytes = bytes.len(), "downloaded cloud repository");
        self.cloud_bytes = Some(bytes);
        Ok(())
    }

    /// Decrypt the download with `entered`, the current code and the
    /// history, in that order. The working code becomes current.
    ///
    /// Returns `false` when no code decrypts the repository. Any crypto
    /// failure other than a wrong code is fatal.
    pub async fn decrypt(
        &mut self,
        ctx: &SyncContext,
        entered: Option<&str>,
    ) -> Result<bool, SyncError> {
        let bytes = self
            .cloud_bytes
            .take()
            .ok_or_else(|| SyncError::Internal("decrypt before download".into()))?;
        let codes = self.settings.transfer_codes_to_try(entered);
        if codes.is_empty() {
            return Ok(false);
        }

        let found = tokio::task::spawn_blocking(move || try_codes(&bytes, codes)).await??;
        let Some((repo, code)) = found else {
            return Ok(false);
        };

        if self.settings.transfer_code.as_deref() != Some(code.as_str()) {
            if self.settings.transfer_code.is_some() && entered.is_none() {
                tracing::warn!("cloud repository opened with an older transfer code");
            }
            self.settings.adopt_transfer_code(&code);
            ctx.settings.save(&self.settings).await?;
        }
        self.cloud_repository = Some(repo);
        Ok(true)
    }

    /// Encrypt `repo` with the current transfer code and upload it.
    pub async fn upload(&self, ctx: &SyncContext, repo: &Repository) -> Result<(), SyncError> {
        let code = self
            .settings
            .transfer_code
            .clone()
            .ok_or(SyncError::MustSyncFullyFirst)?;
        let packed = seal_repository(repo, code, &self.settings).await?;
        ctx.cloud
            .upload(&ctx.cloud_file, &packed, self.credentials()?)
            .await?;
        tracing::info!(notes = repo.notes.len(), "uploaded repository");
        Ok(())
    }
}

/// Encrypt a repository under a transfer code off the async runtime.
pub async fn seal_repository(
    repo: &Repository,
    code: String,
    settings: &Settings,
) -> Result<Vec<u8>, SyncError> {
    let json = Zeroizing::new(repo.to_json_bytes()?);
    let code = Zeroizing::new(code);
    let options = settings.envelope_options();
    let packed = tokio::task::spawn_blocking(move || {
        encrypt(&json, Secret::Password(code.as_str()), &options)
    })
    .await??;
    Ok(packed)
}

type Opened = Option<(Repository, Zeroizing<String>)>;

fn try_codes(bytes: &[u8], codes: Vec<String>) -> Result<Opened, SyncError> {
    for code in codes {
        let code = Zeroizing::new(code);
        match decrypt(bytes, Secret::Password(code.as_str())) {
            Ok(plain) => {
                let plain = Zeroizing::new(plain);
                let repo = Repository::from_json_bytes(&plain)?;
                return Ok(Some((repo, code)));
            }
            Err(CryptoError::DecryptionFailed) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}
