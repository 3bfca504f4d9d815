//! Authenticated symmetric ciphers.
//!
//! Every suite is an AEAD: the ciphertext carries a 16-byte tag and any
//! modification makes decryption fail. Each suite checks the exact key length
//! and a minimum nonce length before touching the data. A longer nonce is
//! accepted and truncated to the suite's nonce size.

use aes_gcm::{aead::consts::U12, AesGcm, Aes256Gcm};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Nonce},
    XChaCha20Poly1305,
};
use twofish::Twofish;

use crate::error::CryptoError;

/// Key size of every registered cipher (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// GCM nonce size (96 bits = 12 bytes).
const GCM_NONCE_SIZE: usize = 12;

/// XChaCha20 nonce size (192 bits = 24 bytes).
const XCHACHA_NONCE_SIZE: usize = 24;

/// Twofish in GCM mode, reusing the generic GCM implementation.
type Twofish256Gcm = AesGcm<Twofish, U12>;

/// Names of all registered ciphers. This set only ever grows.
pub const CIPHER_NAMES: &[&str] = &[
    AesGcmCipher::NAME,
    TwofishGcmCipher::NAME,
    XChaChaCipher::NAME,
];

/// An authenticated symmetric cipher.
pub trait SymmetricCipher: Send + Sync {
    /// Registry name, stored in every envelope header.
    fn name(&self) -> &'static str;

    /// Required key length in bytes.
    fn expected_key_size(&self) -> usize;

    /// Minimum nonce length in bytes.
    fn expected_nonce_size(&self) -> usize;

    /// Encrypt, returning ciphertext with the authentication tag appended.
    fn encrypt(&self, plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt and verify. Fails with `DecryptionFailed` on any tampering.
    fn decrypt(&self, ciphertext: &[u8], key: &[u8], nonce: &[u8])
        -> Result<Vec<u8>, CryptoError>;
}

/// Look up a cipher by its registry name.
pub fn cipher_by_name(name: &str) -> Result<&'static dyn SymmetricCipher, CryptoError> {
    static AES_GCM: AesGcmCipher = AesGcmCipher;
    static TWOFISH_GCM: TwofishGcmCipher = TwofishGcmCipher;
    static XCHACHA: XChaChaCipher = XChaChaCipher;

    match name {
        AesGcmCipher::NAME => Ok(&AES_GCM),
        TwofishGcmCipher::NAME => Ok(&TWOFISH_GCM),
        XChaChaCipher::NAME => Ok(&XCHACHA),
        other => Err(CryptoError::UnknownCipher(other.to_string())),
    }
}

fn check_sizes(
    cipher: &dyn SymmetricCipher,
    key: &[u8],
    nonce: &[u8],
) -> Result<(), CryptoError> {
    if key.len() != cipher.expected_key_size() {
        return Err(CryptoError::InvalidKeyLength {
            expected: cipher.expected_key_size(),
            actual: key.len(),
        });
    }
    if nonce.len() < cipher.expected_nonce_size() {
        return Err(CryptoError::InvalidNonceLength {
            minimum: cipher.expected_nonce_size(),
            actual: nonce.len(),
        });
    }
    Ok(())
}

fn aead_encrypt<C: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    nonce_size: usize,
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        C::new_from_slice(key).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let nonce = Nonce::<C>::from_slice(&nonce[..nonce_size]);
    cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed("aead encrypt failed".into()))
}

fn aead_decrypt<C: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    nonce_size: usize,
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::DecryptionFailed)?;
    let nonce = Nonce::<C>::from_slice(&nonce[..nonce_size]);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// AES-256-GCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    /// Registry name.
    pub const NAME: &'static str = "aes_gcm";
}

impl SymmetricCipher for AesGcmCipher {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn expected_key_size(&self) -> usize {
        KEY_SIZE
    }

    fn expected_nonce_size(&self) -> usize {
        GCM_NONCE_SIZE
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, CryptoError> {
        check_sizes(self, key, nonce)?;
        aead_encrypt::<Aes256Gcm>(key, nonce, GCM_NONCE_SIZE, plaintext)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_sizes(self, key, nonce)?;
        aead_decrypt::<Aes256Gcm>(key, nonce, GCM_NONCE_SIZE, ciphertext)
    }
}

/// Twofish-256 in GCM mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwofishGcmCipher;

impl TwofishGcmCipher {
    /// Registry name.
    pub const NAME: &'static str = "twofish_gcm";
}

impl SymmetricCipher for TwofishGcmCipher {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn expected_key_size(&self) -> usize {
        KEY_SIZE
    }

    fn expected_nonce_size(&self) -> usize {
        GCM_NONCE_SIZE
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, CryptoError> {
        check_sizes(self, key, nonce)?;
        aead_encrypt::<Twofish256Gcm>(key, nonce, GCM_NONCE_SIZE, plaintext)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_sizes(self, key, nonce)?;
        aead_decrypt::<Twofish256Gcm>(key, nonce, GCM_NONCE_SIZE, ciphertext)
    }
}

/// XChaCha20-Poly1305 with 192-bit nonces, safe for random generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct XChaChaCipher;

impl XChaChaCipher {
    /// Registry name.
    pub const NAME: &'static str = "xchacha20_poly1305";
}

impl SymmetricCipher for XChaChaCipher {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn expected_key_size(&self) -> usize {
        KEY_SIZE
    }

    fn expected_nonce_size(&self) -> usize {
        XCHACHA_NONCE_SIZE
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, CryptoError> {
        check_sizes(self, key, nonce)?;
        aead_encrypt::<XChaCha20Poly1305>(key, nonce, XCHACHA_NONCE_SIZE, plaintext)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        nonce: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_sizes(self, key, nonce)?;
        aead_decrypt::<XChaCha20Poly1305>(key, nonce, XCHACHA_NONCE_SIZE, ciphertext)
    }
}
