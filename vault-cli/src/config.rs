//! Configuration management for notevault.
//!
//! Two files live in the data directory:
//! - `notevault.toml`: static application configuration, optional
//! - `settings.json`: sync settings written by the client (cloud location,
//!   transfer codes, last sync fingerprint)

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use vault_crypto::{CostType, EnvelopeOptions};
use vault_sync::{write_atomic, Settings, SettingsStore, StoreError, DEFAULT_CLOUD_FILE};

/// Name of the optional configuration file in the data directory.
pub const CONFIG_FILE: &str = "notevault.toml";

/// Name of the settings file in the data directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Local repository file, relative to the data directory.
    #[serde(default = "default_repository_file")]
    pub repository_file: String,
    /// Repository file name in the cloud.
    #[serde(default = "default_cloud_file")]
    pub cloud_file: String,
    /// Cipher for new envelopes.
    #[serde(default = "default_cipher")]
    pub cipher: String,
    /// KDF for new envelopes.
    #[serde(default = "default_kdf")]
    pub kdf: String,
    /// Compress repositories before encryption.
    #[serde(default = "default_compress")]
    pub compress: bool,
    /// KDF cost for sealing safe keys with a user password.
    #[serde(default)]
    pub safe_cost: SafeCost,
    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

/// KDF cost level for safe passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeCost {
    /// Recommended for user-chosen passwords.
    #[default]
    High,
    /// Fast derivation, for throwaway data and tests.
    Low,
}

impl From<SafeCost> for CostType {
    fn from(cost: SafeCost) -> Self {
        match cost {
            SafeCost::High => CostType::High,
            SafeCost::Low => CostType::Low,
        }
    }
}

// Default value functions
fn default_repository_file() -> String {
    "repository.json".to_string()
}

fn default_cloud_file() -> String {
    DEFAULT_CLOUD_FILE.to_string()
}

fn default_cipher() -> String {
    Settings::default().cipher
}

fn default_kdf() -> String {
    Settings::default().kdf
}

fn default_compress() -> bool {
    true
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            repository_file: default_repository_file(),
            cloud_file: default_cloud_file(),
            cipher: default_cipher(),
            kdf: default_kdf(),
            compress: default_compress(),
            safe_cost: SafeCost::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `explicit` if given, else `notevault.toml` in the data
    /// directory if present, else the defaults.
    pub fn locate(explicit: Option<&Path>, data_dir: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = data_dir.join(CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Envelope options for sealing a new safe.
    pub fn safe_options(&self) -> EnvelopeOptions {
        EnvelopeOptions {
            cipher: self.cipher.clone(),
            kdf: self.kdf.clone(),
            cost: self.safe_cost.into(),
            compress: false,
        }
    }

    /// Envelope options for note content inside a safe.
    pub fn note_options(&self) -> EnvelopeOptions {
        EnvelopeOptions {
            cipher: self.cipher.clone(),
            kdf: self.kdf.clone(),
            cost: CostType::Low,
            compress: self.compress,
        }
    }

    /// Settings used before `settings.json` exists.
    pub fn initial_settings(&self) -> Settings {
        Settings {
            cipher: self.cipher.clone(),
            kdf: self.kdf.clone(),
            compress: self.compress,
            ..Settings::default()
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

/// Settings stored as a JSON file, readable by the owner only.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
    initial: Settings,
}

impl JsonSettingsStore {
    /// Store at `path`, returning `initial` until the first save.
    pub fn new(path: impl Into<PathBuf>, initial: Settings) -> Self {
        Self {
            path: path.into(),
            initial,
        }
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn load(&self) -> Result<Settings, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(self.initial.clone())
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents).map_err(|e| StoreError::Settings(e.to_string()))
    }

    async fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(settings)
            .map_err(|e| StoreError::Settings(e.to_string()))?;
        write_atomic(&self.path, contents.into_bytes()).await?;
        set_file_permissions_0600(&self.path).await?;
        Ok(())
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use vault_sync::CloudCredentials;

    // ===========================================
    // AppConfig Tests
    // ===========================================

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.repository_file, "repository.json");
        assert_eq!(config.cloud_file, DEFAULT_CLOUD_FILE);
        assert!(config.compress);
        assert_eq!(config.safe_cost, SafeCost::High);
        assert_eq!(config.safe_options().cost, CostType::High);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
cloud_file = "shared.bin"
kdf = "pbkdf2"
compress = false
safe_cost = "low"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.cloud_file, "shared.bin");
        assert_eq!(config.kdf, "pbkdf2");
        assert!(!config.compress);
        assert_eq!(config.repository_file, "repository.json");
        assert_eq!(config.safe_options().cost, CostType::Low);

        let settings = config.initial_settings();
        assert_eq!(settings.kdf, "pbkdf2");
        assert!(!settings.compress);
    }

    #[test]
    fn locate_prefers_data_dir_file() {
        let dir = tempdir().unwrap();
        assert_eq!(
            AppConfig::locate(None, dir.path()).unwrap(),
            AppConfig::default()
        );

        std::fs::write(dir.path().join(CONFIG_FILE), "log_filter = \"debug\"").unwrap();
        assert_eq!(
            AppConfig::locate(None, dir.path()).unwrap().log_filter,
            "debug"
        );
    }

    #[test]
    fn broken_config_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "compress = [").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    // ===========================================
    // JsonSettingsStore Tests
    // ===========================================

    #[tokio::test]
    async fn settings_roundtrip() {
        let dir = tempdir().unwrap();
        let store = JsonSettingsStore::new(dir.path().join(SETTINGS_FILE), Settings::default());
        assert_eq!(store.load().await.unwrap(), Settings::default());

        let settings = Settings {
            cloud: Some(CloudCredentials::new("/mnt/cloud")),
            transfer_code: Some("abcdefghijkmnpqr".into()),
            last_sync_fingerprint: Some(7),
            ..Settings::default()
        };
        store.save(&settings).await.unwrap();
        assert_eq!(store.load().await.unwrap(), settings);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn settings_file_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let store = JsonSettingsStore::new(&path, Settings::default());
        store.save(&Settings::default()).await.unwrap();

        let perms = tokio::fs::metadata(&path).await.unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600, "file should be 0600");
    }
}
