//! Safe keyring.
//!
//! A safe's key is sealed under the user's password with the crypto
//! envelope. Opening a safe unseals the key into memory; notes referencing
//! the safe are then encrypted with that key directly (no KDF).

use thiserror::Error;
use vault_crypto::{
    decrypt, encrypt, random_key, CryptoError, EnvelopeOptions, Secret, KEY_SIZE,
};
use vault_types::{Note, Repository, Safe, SafeId};
use zeroize::Zeroizing;

/// Errors from safe operations.
#[derive(Debug, Error)]
pub enum SafeError {
    /// Sealing, unsealing or note encryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The note references a safe the repository does not contain.
    #[error("unknown safe: {0}")]
    UnknownSafe(SafeId),

    /// The safe must be opened first.
    #[error("safe {0} is closed")]
    SafeClosed(SafeId),

    /// Decrypted or sealed content is not valid text.
    #[error("invalid safe content")]
    InvalidContent,
}

/// Create a new safe with a random key sealed under `password`.
///
/// The returned safe is open. Callers normally pass high-cost options.
pub fn create_safe(password: &str, options: &EnvelopeOptions) -> Result<Safe, SafeError> {
    let key = random_key()?;
    let sealed = encrypt(&key, Secret::Password(password), options)?;
    let sealed = String::from_utf8(sealed).map_err(|_| SafeError::InvalidContent)?;

    let mut safe = Safe::new(sealed);
    safe.open_with(key);
    tracing::debug!(safe = %safe.id, "created safe");
    Ok(safe)
}

/// Unseal a safe's key with `password`.
///
/// A sealed key of the wrong length is rejected and the safe stays closed.
pub fn open_safe(safe: &mut Safe, password: &str) -> Result<(), SafeError> {
    let key = Zeroizing::new(decrypt(
        safe.serializeable_key.as_bytes(),
        Secret::Password(password),
    )?);
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: key.len(),
        }
        .into());
    }
    safe.open_with(key);
    Ok(())
}

/// Open every closed safe in the repository that `password` unseals.
///
/// Returns how many safes were opened. Safes sealed under other passwords
/// stay closed.
pub fn open_safes(repo: &mut Repository, password: &str) -> usize {
    let mut opened = 0;
    for safe in repo.safes.iter_mut().filter(|s| !s.is_open()) {
        match open_safe(safe, password) {
            Ok(()) => opened += 1,
            Err(e) => tracing::debug!(safe = %safe.id, error = %e, "safe stays closed"),
        }
    }
    opened
}

/// Encrypt a note's content with an open safe and link it to the safe.
pub fn encrypt_note(
    note: &mut Note,
    safe: &Safe,
    options: &EnvelopeOptions,
) -> Result<(), SafeError> {
    let key = safe.key().ok_or(SafeError::SafeClosed(safe.id))?;
    let packed = encrypt(note.content.as_bytes(), Secret::Key(key), options)?;
    note.content = String::from_utf8(packed).map_err(|_| SafeError::InvalidContent)?;
    note.safe_id = Some(safe.id);
    Ok(())
}

/// Plain content of a note, decrypting it when it belongs to a safe.
pub fn decrypt_note(note: &Note, repo: &Repository) -> Result<String, SafeError> {
    let Some(safe_id) = note.safe_id else {
        return Ok(note.content.clone());
    };
    let safe = repo
        .find_safe(safe_id)
        .ok_or(SafeError::UnknownSafe(safe_id))?;
    let key = safe.key().ok_or(SafeError::SafeClosed(safe_id))?;

    let plain = decrypt(note.content.as_bytes(), Secret::Key(key))?;
    String::from_utf8(plain).map_err(|_| SafeError::InvalidContent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_crypto::{CostType, Pbkdf2Kdf, XChaChaCipher};

    fn options() -> EnvelopeOptions {
        EnvelopeOptions {
            cipher: XChaChaCipher::NAME.into(),
            kdf: Pbkdf2Kdf::NAME.into(),
            cost: CostType::Low,
            compress: false,
        }
    }

    // ===========================================
    // Keyring Tests
    // ===========================================

    #[test]
    fn created_safe_is_open_and_reopens() {
        let safe = create_safe("vault password", &options()).unwrap();
        assert!(safe.is_open());
        let key = safe.key().unwrap().to_vec();

        let mut copy = safe.clone();
        assert!(!copy.is_open());
        open_safe(&mut copy, "vault password").unwrap();
        assert_eq!(copy.key().unwrap(), key.as_slice());
    }

    #[test]
    fn wrong_password_keeps_safe_closed() {
        let mut safe = create_safe("right", &options()).unwrap();
        safe.close();

        let result = open_safe(&mut safe, "wrong");
        assert!(matches!(
            result,
            Err(SafeError::Crypto(CryptoError::DecryptionFailed))
        ));
        assert!(!safe.is_open());
    }

    #[test]
    fn short_sealed_key_is_rejected() {
        let sealed = encrypt(&[7u8; 16], Secret::Password("vault password"), &options()).unwrap();
        let mut safe = Safe::new(String::from_utf8(sealed).unwrap());

        let result = open_safe(&mut safe, "vault password");
        assert!(matches!(
            result,
            Err(SafeError::Crypto(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: 16
            }))
        ));
        assert!(!safe.is_open());
    }

    #[test]
    fn open_safes_counts_matching_password() {
        let mut repo = Repository::new();
        repo.safes.push(create_safe("one", &options()).unwrap());
        repo.safes.push(create_safe("two", &options()).unwrap());
        repo.close_all_safes();

        assert_eq!(open_safes(&mut repo, "one"), 1);
        assert!(repo.safes[0].is_open());
        assert!(!repo.safes[1].is_open());
    }

    // ===========================================
    // Note Encryption Tests
    // ===========================================

    #[test]
    fn note_roundtrip_through_safe() {
        let mut repo = Repository::new();
        let safe = create_safe("pw", &options()).unwrap();
        let mut note = Note::with_content("secret shopping list");

        encrypt_note(&mut note, &safe, &options()).unwrap();
        assert_ne!(note.content, "secret shopping list");
        assert_eq!(note.safe_id, Some(safe.id));

        let mut sealed = safe.clone();
        repo.safes.push(safe);
        assert_eq!(decrypt_note(&note, &repo).unwrap(), "secret shopping list");

        sealed.close();
        repo.safes[0] = sealed;
        assert!(matches!(
            decrypt_note(&note, &repo),
            Err(SafeError::SafeClosed(_))
        ));
    }

    #[test]
    fn plain_note_needs_no_safe() {
        let repo = Repository::new();
        let note = Note::with_content("plain");
        assert_eq!(decrypt_note(&note, &repo).unwrap(), "plain");
    }

    #[test]
    fn unknown_safe_is_reported() {
        let repo = Repository::new();
        let mut note = Note::with_content("x");
        let missing = SafeId::new();
        note.safe_id = Some(missing);
        assert!(matches!(
            decrypt_note(&note, &repo),
            Err(SafeError::UnknownSafe(id)) if id == missing
        ));
    }

    #[test]
    fn closed_safe_cannot_encrypt() {
        let mut safe = create_safe("pw", &options()).unwrap();
        safe.close();
        let mut note = Note::with_content("x");
        assert!(matches!(
            encrypt_note(&mut note, &safe, &options()),
            Err(SafeError::SafeClosed(_))
        ));
        assert_eq!(note.content, "x");
    }
}
