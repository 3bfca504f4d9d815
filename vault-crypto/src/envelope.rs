//! Self-describing encrypted envelopes.
//!
//! Wire format (before the outer base64 wrapper):
//!
//! ```text
//! package $ cipher $ kdf $ cost $ base64(nonce) $ base64(salt) $ ciphertext...
//! ```
//!
//! The ciphertext is raw bytes and may itself contain `$`, so unpacking
//! counts exactly six delimiters from the start and takes the remainder
//! verbatim. It never searches for a delimiter inside the ciphertext.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::io::Read;
use zeroize::Zeroizing;

use crate::cipher::{cipher_by_name, XChaChaCipher};
use crate::error::CryptoError;
use crate::kdf::{kdf_by_name, Argon2Kdf, CostType};
use crate::random::random_bytes;

/// Package tag of an uncompressed envelope.
pub const PACKAGE_NAME: &str = "notevault";

/// Package tag of an envelope whose plaintext was zstd-compressed.
pub const COMPRESSED_PACKAGE_NAME: &str = "notevault.zstd";

/// KDF name recorded when the caller supplies the key directly.
pub const KEY_KDF_NAME: &str = "none";

const KEY_COST: &str = "0";
const DELIMITER: u8 = b'$';
const HEADER_FIELDS: usize = 6;
const ZSTD_LEVEL: i32 = 3;

/// Upper bound on the plaintext a compressed envelope may expand to.
const MAX_DECOMPRESSED_SIZE: u64 = 64 * 1024 * 1024;

/// Everything needed to decrypt, travelling in front of the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// Package tag, also encoding the compression flag.
    pub package: String,
    /// Cipher registry name.
    pub cipher: String,
    /// KDF registry name, or [`KEY_KDF_NAME`].
    pub kdf: String,
    /// KDF cost descriptor.
    pub cost: String,
    /// Cipher nonce.
    pub nonce: Vec<u8>,
    /// KDF salt (empty for key envelopes).
    pub salt: Vec<u8>,
}

impl EnvelopeHeader {
    /// Whether the plaintext was compressed before encryption.
    pub fn is_compressed(&self) -> bool {
        self.package == COMPRESSED_PACKAGE_NAME
    }
}

/// The secret an envelope is sealed with.
#[derive(Clone, Copy)]
pub enum Secret<'a> {
    /// A password, stretched through the named KDF.
    Password(&'a str),
    /// A ready-made key of the cipher's key size.
    Key(&'a [u8]),
}

// Don't leak secrets in debug output
impl std::fmt::Debug for Secret<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password(_) => write!(f, "Secret::Password([REDACTED])"),
            Self::Key(_) => write!(f, "Secret::Key([REDACTED])"),
        }
    }
}

/// Algorithm choice for new envelopes. Decryption ignores these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeOptions {
    /// Cipher registry name.
    pub cipher: String,
    /// KDF registry name.
    pub kdf: String,
    /// Cost level passed to the KDF.
    pub cost: CostType,
    /// Compress the plaintext before encrypting.
    pub compress: bool,
}

impl EnvelopeOptions {
    /// Same algorithms with a different cost level.
    pub fn with_cost(mut self, cost: CostType) -> Self {
        self.cost = cost;
        self
    }
}

impl Default for EnvelopeOptions {
    fn default() -> Self {
        Self {
            cipher: XChaChaCipher::NAME.to_string(),
            kdf: Argon2Kdf::NAME.to_string(),
            cost: CostType::Low,
            compress: true,
        }
    }
}

/// Serialize a header and ciphertext into the base64 package.
pub fn pack(header: &EnvelopeHeader, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    for field in [&header.package, &header.cipher, &header.kdf, &header.cost] {
        if field.as_bytes().contains(&DELIMITER) {
            return Err(CryptoError::InvalidEnvelope(format!(
                "header field contains delimiter: {:?}",
                field
            )));
        }
    }

    let nonce = STANDARD.encode(&header.nonce);
    let salt = STANDARD.encode(&header.salt);
    let fields = [
        header.package.as_str(),
        header.cipher.as_str(),
        header.kdf.as_str(),
        header.cost.as_str(),
        nonce.as_str(),
        salt.as_str(),
    ];

    let header_len: usize = fields.iter().map(|f| f.len() + 1).sum();
    let mut raw = Vec::with_capacity(header_len + ciphertext.len());
    for field in fields {
        raw.extend_from_slice(field.as_bytes());
        raw.push(DELIMITER);
    }
    raw.extend_from_slice(ciphertext);

    Ok(STANDARD.encode(raw).into_bytes())
}

/// Split a base64 package back into header and ciphertext.
pub fn unpack(packed: &[u8]) -> Result<(EnvelopeHeader, Vec<u8>), CryptoError> {
    let raw = STANDARD
        .decode(packed.trim_ascii())
        .map_err(|e| CryptoError::InvalidEnvelope(format!("outer base64: {}", e)))?;

    let mut fields: Vec<&str> = Vec::with_capacity(HEADER_FIELDS);
    let mut start = 0;
    while fields.len() < HEADER_FIELDS {
        let end = raw[start..]
            .iter()
            .position(|b| *b == DELIMITER)
            .map(|offset| start + offset)
            .ok_or_else(|| CryptoError::InvalidEnvelope("truncated header".into()))?;
        let field = std::str::from_utf8(&raw[start..end])
            .map_err(|_| CryptoError::InvalidEnvelope("header is not utf-8".into()))?;
        fields.push(field);
        start = end + 1;
    }

    let package = fields[0];
    if package != PACKAGE_NAME && package != COMPRESSED_PACKAGE_NAME {
        return Err(CryptoError::UnsupportedPackage(package.to_string()));
    }

    let decode = |name: &str, value: &str| {
        STANDARD
            .decode(value)
            .map_err(|e| CryptoError::InvalidEnvelope(format!("{}: {}", name, e)))
    };

    let header = EnvelopeHeader {
        package: package.to_string(),
        cipher: fields[1].to_string(),
        kdf: fields[2].to_string(),
        cost: fields[3].to_string(),
        nonce: decode("nonce", fields[4])?,
        salt: decode("salt", fields[5])?,
    };
    Ok((header, raw[start..].to_vec()))
}

/// Encrypt a message into a packed envelope.
///
/// A fresh nonce (and for passwords a fresh salt) is drawn for every call.
pub fn encrypt(
    message: &[u8],
    secret: Secret<'_>,
    options: &EnvelopeOptions,
) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_by_name(&options.cipher)?;
    let nonce = random_bytes(cipher.expected_nonce_size())?;

    let (kdf_name, cost, salt, key) = match secret {
        Secret::Password(password) => {
            let password = Zeroizing::new(password.as_bytes().to_vec());
            if password.is_empty() {
                return Err(CryptoError::EmptyPassword);
            }
            let kdf = kdf_by_name(&options.kdf)?;
            let salt = random_bytes(kdf.expected_salt_size())?;
            let cost = kdf.recommended_cost(options.cost);
            let key = kdf.derive(&password, cipher.expected_key_size(), &salt, &cost)?;
            (kdf.name().to_string(), cost, salt, key)
        }
        Secret::Key(key) => (
            KEY_KDF_NAME.to_string(),
            KEY_COST.to_string(),
            Vec::new(),
            Zeroizing::new(key.to_vec()),
        ),
    };

    let ciphertext = if options.compress {
        let compressed = Zeroizing::new(
            zstd::encode_all(message, ZSTD_LEVEL)
                .map_err(|e| CryptoError::Compression(e.to_string()))?,
        );
        cipher.encrypt(&compressed, &key, &nonce)?
    } else {
        cipher.encrypt(message, &key, &nonce)?
    };

    let header = EnvelopeHeader {
        package: if options.compress {
            COMPRESSED_PACKAGE_NAME
        } else {
            PACKAGE_NAME
        }
        .to_string(),
        cipher: cipher.name().to_string(),
        kdf: kdf_name,
        cost,
        nonce,
        salt,
    };
    pack(&header, &ciphertext)
}

/// Decrypt a packed envelope.
///
/// Algorithms come from the header; an unknown name is a fatal error.
pub fn decrypt(packed: &[u8], secret: Secret<'_>) -> Result<Vec<u8>, CryptoError> {
    let (header, ciphertext) = unpack(packed)?;
    let cipher = cipher_by_name(&header.cipher)?;

    let key = match (secret, header.kdf.as_str()) {
        (Secret::Key(key), KEY_KDF_NAME) => Zeroizing::new(key.to_vec()),
        (Secret::Key(_), _) | (Secret::Password(_), KEY_KDF_NAME) => {
            return Err(CryptoError::WrongSecretKind)
        }
        (Secret::Password(password), kdf_name) => {
            let password = Zeroizing::new(password.as_bytes().to_vec());
            if password.is_empty() {
                return Err(CryptoError::EmptyPassword);
            }
            let kdf = kdf_by_name(kdf_name)?;
            kdf.derive(
                &password,
                cipher.expected_key_size(),
                &header.salt,
                &header.cost,
            )?
        }
    };

    let plaintext = Zeroizing::new(cipher.decrypt(&ciphertext, &key, &header.nonce)?);
    if header.is_compressed() {
        decompress_limited(&plaintext, MAX_DECOMPRESSED_SIZE)
    } else {
        Ok(plaintext.to_vec())
    }
}

/// Inflate zstd data, refusing output larger than `limit` bytes.
fn decompress_limited(data: &[u8], limit: u64) -> Result<Vec<u8>, CryptoError> {
    let decoder =
        zstd::stream::read::Decoder::new(data).map_err(|e| CryptoError::Compression(e.to_string()))?;
    let mut out = Vec::new();
    decoder
        .take(limit + 1)
        .read_to_end(&mut out)
        .map_err(|e| CryptoError::Compression(e.to_string()))?;
    if out.len() as u64 > limit {
        return Err(CryptoError::Compression(format!(
            "decompressed data exceeds {limit} bytes"
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{AesGcmCipher, TwofishGcmCipher, CIPHER_NAMES, KEY_SIZE};
    use crate::kdf::Pbkdf2Kdf;

    /// Produced by an earlier build: PBKDF2 (1000 iterations) + AES-256-GCM,
    /// uncompressed, password "correct horse battery staple".
    const FIXED_ENVELOPE: &str = "bm90ZXZhdWx0JGFlc19nY20kcGJrZGYyJDEwMDAkWkdWbVoyaHBhbXRzYlc1diRBQUVDQXdRRkJnY0lDUW9MREEwT0R3PT0kt/SOi90ZYlU54z0+wQX5vBwnWDFMhHwHFNsVRc/aTvBV";

    fn header() -> EnvelopeHeader {
        EnvelopeHeader {
            package: PACKAGE_NAME.into(),
            cipher: AesGcmCipher::NAME.into(),
            kdf: Pbkdf2Kdf::NAME.into(),
            cost: "1000".into(),
            nonce: vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
            salt: vec![0xEE; 16],
        }
    }

    fn fast_options(cipher: &str) -> EnvelopeOptions {
        EnvelopeOptions {
            cipher: cipher.into(),
            kdf: Pbkdf2Kdf::NAME.into(),
            cost: CostType::Low,
            compress: false,
        }
    }

    // ===========================================
    // Pack / Unpack Tests
    // ===========================================

    #[test]
    fn unpack_reverses_pack() {
        let ciphertext = b"opaque ciphertext".to_vec();
        let packed = pack(&header(), &ciphertext).unwrap();
        let (h, c) = unpack(&packed).unwrap();
        assert_eq!(h, header());
        assert_eq!(c, ciphertext);
    }

    #[test]
    fn ciphertext_with_delimiters_survives() {
        let ciphertext = b"$$a$b$$$c$d$e$f$g$".to_vec();
        let packed = pack(&header(), &ciphertext).unwrap();
        let (h, c) = unpack(&packed).unwrap();
        assert_eq!(h, header());
        assert_eq!(c, ciphertext);
    }

    #[test]
    fn empty_ciphertext_and_salt_survive() {
        let mut h = header();
        h.salt.clear();
        let packed = pack(&h, b"").unwrap();
        let (back, c) = unpack(&packed).unwrap();
        assert_eq!(back, h);
        assert!(c.is_empty());
    }

    #[test]
    fn packed_output_is_text_safe() {
        let packed = pack(&header(), &[0u8, 0xFF, b'$', b'\n']).unwrap();
        assert!(packed
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || b"+/=".contains(b)));
    }

    #[test]
    fn unpack_tolerates_trailing_newline() {
        let mut packed = pack(&header(), b"ct").unwrap();
        packed.push(b'\n');
        assert!(unpack(&packed).is_ok());
    }

    #[test]
    fn pack_rejects_delimiter_in_names() {
        let mut h = header();
        h.cipher = "aes$gcm".into();
        assert!(matches!(pack(&h, b"x"), Err(CryptoError::InvalidEnvelope(_))));
    }

    #[test]
    fn unpack_rejects_truncated_header() {
        let raw = STANDARD.encode("notevault$aes_gcm$pbkdf2");
        let result = unpack(raw.as_bytes());
        assert!(matches!(result, Err(CryptoError::InvalidEnvelope(_))));
    }

    #[test]
    fn unpack_rejects_foreign_package() {
        let raw = STANDARD.encode("otherapp$aes_gcm$pbkdf2$1000$AAAA$AAAA$ct");
        let result = unpack(raw.as_bytes());
        assert!(matches!(result, Err(CryptoError::UnsupportedPackage(p)) if p == "otherapp"));
    }

    #[test]
    fn unpack_rejects_bad_base64() {
        assert!(matches!(
            unpack(b"!!not base64!!"),
            Err(CryptoError::InvalidEnvelope(_))
        ));
    }

    // ===========================================
    // Encrypt / Decrypt Tests
    // ===========================================

    #[test]
    fn fixed_envelope_still_decrypts() {
        let plain = decrypt(
            FIXED_ENVELOPE.as_bytes(),
            Secret::Password("correct horse battery staple"),
        )
        .unwrap();
        assert_eq!(plain, b"Remember the milk");
    }

    #[test]
    fn fixed_envelope_header_is_readable() {
        let (h, _) = unpack(FIXED_ENVELOPE.as_bytes()).unwrap();
        assert_eq!(h.cipher, "aes_gcm");
        assert_eq!(h.kdf, "pbkdf2");
        assert_eq!(h.cost, "1000");
        assert!(!h.is_compressed());
    }

    #[test]
    fn fixed_envelope_wrong_password_fails() {
        let result = decrypt(FIXED_ENVELOPE.as_bytes(), Secret::Password("wrong"));
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn password_roundtrip_every_cipher() {
        for cipher in CIPHER_NAMES {
            let packed = encrypt(b"my notes", Secret::Password("pw"), &fast_options(cipher)).unwrap();
            let (h, _) = unpack(&packed).unwrap();
            assert_eq!(h.cipher, *cipher);
            let plain = decrypt(&packed, Secret::Password("pw")).unwrap();
            assert_eq!(plain, b"my notes");
        }
    }

    #[test]
    fn compressed_roundtrip_with_argon2() {
        let options = EnvelopeOptions {
            cipher: TwofishGcmCipher::NAME.into(),
            ..EnvelopeOptions::default()
        };
        let message = "note ".repeat(500);
        let packed = encrypt(message.as_bytes(), Secret::Password("transfer"), &options).unwrap();

        let (h, ciphertext) = unpack(&packed).unwrap();
        assert!(h.is_compressed());
        assert_eq!(h.kdf, Argon2Kdf::NAME);
        assert!(ciphertext.len() < message.len());

        let plain = decrypt(&packed, Secret::Password("transfer")).unwrap();
        assert_eq!(plain, message.as_bytes());
    }

    #[test]
    fn decompression_stops_at_limit() {
        let zeros = vec![0u8; 1024 * 1024];
        let bomb = zstd::encode_all(zeros.as_slice(), ZSTD_LEVEL).unwrap();
        assert!(bomb.len() < 1024);

        assert!(matches!(
            decompress_limited(&bomb, 64 * 1024),
            Err(CryptoError::Compression(_))
        ));
        assert_eq!(
            decompress_limited(&bomb, zeros.len() as u64).unwrap().len(),
            zeros.len()
        );
    }

    #[test]
    fn key_roundtrip() {
        let key = [0x5Au8; KEY_SIZE];
        let packed = encrypt(b"safe note", Secret::Key(&key), &EnvelopeOptions::default()).unwrap();
        let (h, _) = unpack(&packed).unwrap();
        assert_eq!(h.kdf, KEY_KDF_NAME);
        assert!(h.salt.is_empty());
        assert_eq!(decrypt(&packed, Secret::Key(&key)).unwrap(), b"safe note");
    }

    #[test]
    fn secret_kind_must_match() {
        let key = [0x5Au8; KEY_SIZE];
        let packed = encrypt(b"x", Secret::Key(&key), &EnvelopeOptions::default()).unwrap();
        assert!(matches!(
            decrypt(&packed, Secret::Password("pw")),
            Err(CryptoError::WrongSecretKind)
        ));
        assert!(matches!(
            decrypt(FIXED_ENVELOPE.as_bytes(), Secret::Key(&key)),
            Err(CryptoError::WrongSecretKind)
        ));
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(matches!(
            encrypt(b"x", Secret::Password(""), &fast_options(AesGcmCipher::NAME)),
            Err(CryptoError::EmptyPassword)
        ));
        assert!(matches!(
            decrypt(FIXED_ENVELOPE.as_bytes(), Secret::Password("")),
            Err(CryptoError::EmptyPassword)
        ));
    }

    #[test]
    fn unknown_algorithm_names_are_fatal() {
        let packed = pack(
            &EnvelopeHeader {
                cipher: "rot13".into(),
                ..header()
            },
            b"ct",
        )
        .unwrap();
        assert!(matches!(
            decrypt(&packed, Secret::Password("pw")),
            Err(CryptoError::UnknownCipher(_))
        ));

        let packed = pack(
            &EnvelopeHeader {
                kdf: "bcrypt".into(),
                ..header()
            },
            b"ct",
        )
        .unwrap();
        assert!(matches!(
            decrypt(&packed, Secret::Password("pw")),
            Err(CryptoError::UnknownKdf(_))
        ));

        let options = EnvelopeOptions {
            cipher: "rot13".into(),
            ..fast_options(AesGcmCipher::NAME)
        };
        assert!(matches!(
            encrypt(b"x", Secret::Password("pw"), &options),
            Err(CryptoError::UnknownCipher(_))
        ));
    }

    #[test]
    fn tampered_envelope_fails() {
        let packed = encrypt(b"payload", Secret::Password("pw"), &fast_options(AesGcmCipher::NAME)).unwrap();
        let (h, mut ciphertext) = unpack(&packed).unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x80;
        let repacked = pack(&h, &ciphertext).unwrap();
        assert!(matches!(
            decrypt(&repacked, Secret::Password("pw")),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn each_encryption_uses_fresh_nonce_and_salt() {
        let options = fast_options(AesGcmCipher::NAME);
        let a = encrypt(b"same", Secret::Password("pw"), &options).unwrap();
        let b = encrypt(b"same", Secret::Password("pw"), &options).unwrap();
        let (ha, _) = unpack(&a).unwrap();
        let (hb, _) = unpack(&b).unwrap();
        assert_ne!(ha.nonce, hb.nonce);
        assert_ne!(ha.salt, hb.salt);
    }

    #[test]
    fn secret_debug_is_redacted() {
        let debug = format!("{:?}", Secret::Password("hunter2"));
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("hunter2"));
    }
}
