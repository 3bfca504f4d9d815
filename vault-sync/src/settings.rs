//! Sync settings.
//!
//! Everything a sync needs to remember between runs: where the cloud is,
//! the transfer codes, which algorithms new envelopes use and the
//! fingerprint of the last synchronized repository.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use vault_crypto::{CostType, EnvelopeOptions};

use crate::cloud::CloudCredentials;
use crate::store::StoreError;
use crate::transfer_code::normalize_transfer_code;

fn default_cipher() -> String {
    EnvelopeOptions::default().cipher
}

fn default_kdf() -> String {
    EnvelopeOptions::default().kdf
}

fn default_compress() -> bool {
    true
}

/// Persisted sync settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Cloud location and credentials, once set up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<CloudCredentials>,
    /// Current transfer code, normalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_code: Option<String>,
    /// Previously used transfer codes, newest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfer_code_history: Vec<String>,
    /// Cipher for new envelopes.
    #[serde(default = "default_cipher")]
    pub cipher: String,
    /// KDF for new envelopes.
    #[serde(default = "default_kdf")]
    pub kdf: String,
    /// Compress repositories before encryption.
    #[serde(default = "default_compress")]
    pub compress: bool,
    /// Fingerprint of the repository after the last successful sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_fingerprint: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cloud: None,
            transfer_code: None,
            transfer_code_history: Vec::new(),
            cipher: default_cipher(),
            kdf: default_kdf(),
            compress: default_compress(),
            last_sync_fingerprint: None,
        }
    }
}

impl Settings {
    /// Envelope options for encrypting the cloud repository.
    ///
    /// Repositories are sealed with the low KDF cost.
    pub fn envelope_options(&self) -> EnvelopeOptions {
        EnvelopeOptions {
            cipher: self.cipher.clone(),
            kdf: self.kdf.clone(),
            cost: CostType::Low,
            compress: self.compress,
        }
    }

    /// Codes to try when decrypting, in order: the one the user just
    /// entered, the current one, then the history. Duplicates and empty
    /// codes are dropped.
    pub fn transfer_codes_to_try(&self, entered: Option<&str>) -> Vec<String> {
        let entered = entered.map(normalize_transfer_code);
        let mut codes: Vec<String> = Vec::new();
        for code in entered
            .into_iter()
            .chain(self.transfer_code.iter().cloned())
            .chain(self.transfer_code_history.iter().cloned())
        {
            if !code.is_empty() && !codes.contains(&code) {
                codes.push(code);
            }
        }
        codes
    }

    /// Make `code` the current transfer code, moving the previous one into
    /// the history. Returns whether anything changed.
    pub fn adopt_transfer_code(&mut self, code: &str) -> bool {
        let code = normalize_transfer_code(code);
        if self.transfer_code.as_deref() == Some(code.as_str()) {
            return false;
        }
        self.transfer_code_history.retain(|c| *c != code);
        if let Some(previous) = self.transfer_code.take() {
            self.transfer_code_history.retain(|c| *c != previous);
            self.transfer_code_history.insert(0, previous);
        }
        self.transfer_code = Some(code);
        true
    }
}

// Don't leak transfer codes in debug output
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("cloud", &self.cloud)
            .field("has_transfer_code", &self.transfer_code.is_some())
            .field("history_len", &self.transfer_code_history.len())
            .field("cipher", &self.cipher)
            .field("kdf", &self.kdf)
            .field("compress", &self.compress)
            .field("last_sync_fingerprint", &self.last_sync_fingerprint)
            .finish()
    }
}

/// Where settings are loaded from and saved to.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the settings. Missing settings load as the defaults.
    async fn load(&self) -> Result<Settings, StoreError>;

    /// Save the settings.
    async fn save(&self, settings: &Settings) -> Result<(), StoreError>;
}

/// In-memory settings store.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    inner: Arc<Mutex<Settings>>,
}

impl MemorySettingsStore {
    /// Store holding the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `settings`.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(settings)),
        }
    }

    /// Current settings.
    pub fn get(&self) -> Settings {
        self.inner.lock().unwrap().clone()
    }
}

impl Clone for MemorySettingsStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Settings, StoreError> {
        Ok(self.get())
    }

    async fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        *self.inner.lock().unwrap() = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // Transfer Code Tests
    // ===========================================

    #[test]
    fn codes_to_try_order_and_dedup() {
        let settings = Settings {
            transfer_code: Some("current".into()),
            transfer_code_history: vec!["older".into(), "current".into(), "oldest".into()],
            ..Settings::default()
        };

        assert_eq!(
            settings.transfer_codes_to_try(Some("NEW-CODE")),
            vec!["newcode", "current", "older", "oldest"]
        );
        assert_eq!(
            settings.transfer_codes_to_try(Some("current")),
            vec!["current", "older", "oldest"]
        );
        assert!(Settings::default().transfer_codes_to_try(None).is_empty());
    }

    #[test]
    fn adopt_moves_previous_into_history() {
        let mut settings = Settings {
            transfer_code: Some("first".into()),
            transfer_code_history: vec!["second".into()],
            ..Settings::default()
        };

        assert!(settings.adopt_transfer_code("second"));
        assert_eq!(settings.transfer_code.as_deref(), Some("second"));
        assert_eq!(settings.transfer_code_history, vec!["first".to_string()]);

        assert!(!settings.adopt_transfer_code("SECOND"));
    }

    // ===========================================
    // Serialization Tests
    // ===========================================

    #[test]
    fn defaults_fill_missing_fields() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.compress);
        assert_eq!(settings.envelope_options().cipher, default_cipher());
    }

    #[test]
    fn debug_hides_codes() {
        let settings = Settings {
            transfer_code: Some("abcdefghijkmnpqr".into()),
            ..Settings::default()
        };
        assert!(!format!("{:?}", settings).contains("abcdefghijkmnpqr"));
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemorySettingsStore::new();
        let mut settings = store.load().await.unwrap();
        settings.last_sync_fingerprint = Some(42);
        store.save(&settings).await.unwrap();
        assert_eq!(store.get().last_sync_fingerprint, Some(42));
    }
}
