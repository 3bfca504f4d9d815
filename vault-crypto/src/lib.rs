//! # vault-crypto
//!
//! Cryptographic envelope for NoteVault repositories.
//!
//! ## Layers
//!
//! - **Cipher suite**: AES-256-GCM, Twofish-256-GCM and XChaCha20-Poly1305,
//!   all authenticated, behind [`SymmetricCipher`]
//! - **Key derivation suite**: PBKDF2-HMAC-SHA256 and Argon2id with tunable
//!   cost, behind [`KeyDerivation`]
//! - **Envelope**: a self-describing package carrying the algorithm names,
//!   cost, nonce and salt next to the ciphertext
//!
//! ```text
//! base64( "notevault$cipher$kdf$cost$b64(nonce)$b64(salt)$" || ciphertext )
//! ```
//!
//! Decryption resolves the algorithms from the names stored in the header,
//! never from the current defaults, so every envelope ever written stays
//! decryptable after the defaults change.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vault_crypto::{decrypt, encrypt, EnvelopeOptions, Secret};
//!
//! let packed = encrypt(b"my notes", Secret::Password("pw"), &EnvelopeOptions::default())?;
//! let plain = decrypt(&packed, Secret::Password("pw"))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cipher;
mod envelope;
mod error;
mod kdf;
mod random;

pub use cipher::{
    cipher_by_name, AesGcmCipher, SymmetricCipher, TwofishGcmCipher, XChaChaCipher,
    CIPHER_NAMES, KEY_SIZE,
};
pub use envelope::{
    decrypt, encrypt, pack, unpack, EnvelopeHeader, EnvelopeOptions, Secret,
    COMPRESSED_PACKAGE_NAME, KEY_KDF_NAME, PACKAGE_NAME,
};
pub use error::CryptoError;
pub use kdf::{
    kdf_by_name, Argon2Cost, Argon2Kdf, CostType, KeyDerivation, Pbkdf2Kdf, KDF_NAMES,
};
pub use random::{random_bytes, random_key};
