//! Error types for vault-crypto.

use thiserror::Error;

/// Crypto errors.
///
/// All of these are fatal to the current operation and never retried: they
/// signal a wrong secret, tampering or an unsupported format.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Password was empty.
    #[error("password must not be empty")]
    EmptyPassword,

    /// Cipher name not in the registry.
    #[error("unknown cipher algorithm: {0}")]
    UnknownCipher(String),

    /// Key derivation name not in the registry.
    #[error("unknown key derivation function: {0}")]
    UnknownKdf(String),

    /// Cost descriptor could not be parsed or is out of range.
    #[error("invalid cost descriptor: {0:?}")]
    InvalidCost(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Nonce shorter than the cipher requires.
    #[error("invalid nonce length: expected at least {minimum}, got {actual}")]
    InvalidNonceLength {
        /// Minimum length.
        minimum: usize,
        /// Actual length.
        actual: usize,
    },

    /// Envelope is truncated or malformed.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Envelope package tag is not one we produce.
    #[error("unsupported envelope package: {0}")]
    UnsupportedPackage(String),

    /// A password was given for a key envelope, or a key for a password
    /// envelope.
    #[error("secret kind does not match envelope")]
    WrongSecretKind,

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (authentication error).
    /// No details provided to prevent oracle attacks.
    #[error("decryption failed: authentication error")]
    DecryptionFailed,

    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// Compressing or decompressing the payload failed.
    #[error("compression failed: {0}")]
    Compression(String),

    /// The system random source failed.
    #[error("random source failed: {0}")]
    Random(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CryptoError::InvalidKeyLength {
            expected: 32,
            actual: 16,
        };
        assert_eq!(err.to_string(), "invalid key length: expected 32, got 16");
        assert_eq!(
            CryptoError::UnknownCipher("rot13".into()).to_string(),
            "unknown cipher algorithm: rot13"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CryptoError>();
    }
}
