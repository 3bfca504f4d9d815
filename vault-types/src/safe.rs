//! Encrypted key containers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::ids::SafeId;

/// A safe holds a symmetric key that encrypts the notes referencing it.
///
/// The key is persisted only in sealed form (`serializeable_key`, an
/// envelope encrypted under the user's password). While the safe is open the
/// decrypted key lives in memory and is zeroed when the safe is closed or
/// dropped. `key` is `Some` if and only if the safe is open.
#[derive(Serialize, Deserialize)]
pub struct Safe {
    /// Stable identity.
    #[serde(default = "SafeId::new")]
    pub id: SafeId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification of the sealed key.
    pub modified_at: DateTime<Utc>,
    /// The safe key, sealed under the user's password.
    pub serializeable_key: String,
    #[serde(skip)]
    key: Option<Zeroizing<Vec<u8>>>,
}

impl Safe {
    /// Create a closed safe around an already sealed key.
    pub fn new(serializeable_key: String) -> Self {
        let now = Utc::now();
        Self {
            id: SafeId::new(),
            created_at: now,
            modified_at: now,
            serializeable_key,
            key: None,
        }
    }

    /// Whether the decrypted key is present.
    pub fn is_open(&self) -> bool {
        self.key.is_some()
    }

    /// The decrypted key, if open.
    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_ref().map(|k| k.as_slice())
    }

    /// Open the safe with its decrypted key.
    pub fn open_with(&mut self, key: Zeroizing<Vec<u8>>) {
        self.key = Some(key);
    }

    /// Close the safe, zeroing the decrypted key.
    pub fn close(&mut self) {
        // Dropping the Zeroizing buffer wipes it.
        self.key = None;
    }
}

/// Cloning copies the sealed record only. A clone is always closed.
impl Clone for Safe {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            created_at: self.created_at,
            modified_at: self.modified_at,
            serializeable_key: self.serializeable_key.clone(),
            key: None,
        }
    }
}

/// Equality compares the persisted fields only.
impl PartialEq for Safe {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.created_at == other.created_at
            && self.modified_at == other.modified_at
            && self.serializeable_key == other.serializeable_key
    }
}

impl Eq for Safe {}

// Don't leak keys in debug output
impl std::fmt::Debug for Safe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Safe")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("modified_at", &self.modified_at)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_safe_is_closed() {
        let safe = Safe::new("sealed".into());
        assert!(!safe.is_open());
        assert!(safe.key().is_none());
    }

    #[test]
    fn open_and_close() {
        let mut safe = Safe::new("sealed".into());
        safe.open_with(Zeroizing::new(vec![7u8; 32]));
        assert!(safe.is_open());
        assert_eq!(safe.key().unwrap(), &[7u8; 32][..]);

        safe.close();
        assert!(!safe.is_open());
    }

    #[test]
    fn clone_never_copies_key() {
        let mut safe = Safe::new("sealed".into());
        safe.open_with(Zeroizing::new(vec![1u8; 32]));

        let copy = safe.clone();
        assert!(!copy.is_open());
        assert_eq!(copy, safe);
    }

    #[test]
    fn key_is_not_serialized() {
        let mut safe = Safe::new("sealed".into());
        safe.open_with(Zeroizing::new(vec![0xAB; 32]));

        let json = serde_json::to_string(&safe).unwrap();
        assert!(!json.contains("key\":["));
        let back: Safe = serde_json::from_str(&json).unwrap();
        assert!(!back.is_open());
    }

    #[test]
    fn debug_is_redacted() {
        let mut safe = Safe::new("sealed-secret-text".into());
        safe.open_with(Zeroizing::new(vec![0x42; 32]));
        let debug = format!("{:?}", safe);
        assert!(!debug.contains("sealed-secret-text"));
        assert!(debug.contains("open: true"));
    }
}
