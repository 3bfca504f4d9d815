//! Password-based key derivation.
//!
//! Two functions are registered:
//! - `pbkdf2`: PBKDF2-HMAC-SHA256, cost descriptor is the iteration count
//! - `argon2id`: Argon2id v1.3, cost descriptor is `m=<KiB>,t=<iterations>,p=<lanes>`
//!
//! Derivation is deliberately slow (tens to hundreds of milliseconds).
//! Callers on an async runtime should run it on a blocking thread.

use argon2::{Algorithm, Argon2, Params, Version};
use hmac::Hmac;
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Names of all registered key derivation functions. This set only ever grows.
pub const KDF_NAMES: &[&str] = &[Pbkdf2Kdf::NAME, Argon2Kdf::NAME];

/// Cost level for [`KeyDerivation::recommended_cost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostType {
    /// For high-entropy secrets such as generated transfer codes.
    #[default]
    Low,
    /// For user-chosen passwords.
    High,
}

/// A password-to-key function with tunable cost.
pub trait KeyDerivation: Send + Sync {
    /// Registry name, stored in every envelope header.
    fn name(&self) -> &'static str;

    /// Salt length this function expects.
    fn expected_salt_size(&self) -> usize;

    /// Cost descriptor recommended for the given level.
    fn recommended_cost(&self, cost: CostType) -> String;

    /// Derive `key_size` bytes from `password`.
    fn derive(
        &self,
        password: &[u8],
        key_size: usize,
        salt: &[u8],
        cost: &str,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// Look up a key derivation function by its registry name.
pub fn kdf_by_name(name: &str) -> Result<&'static dyn KeyDerivation, CryptoError> {
    static PBKDF2: Pbkdf2Kdf = Pbkdf2Kdf;
    static ARGON2: Argon2Kdf = Argon2Kdf;

    match name {
        Pbkdf2Kdf::NAME => Ok(&PBKDF2),
        Argon2Kdf::NAME => Ok(&ARGON2),
        other => Err(CryptoError::UnknownKdf(other.to_string())),
    }
}

// ===========================================
// PBKDF2
// ===========================================

/// PBKDF2 with HMAC-SHA256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pbkdf2Kdf;

impl Pbkdf2Kdf {
    /// Registry name.
    pub const NAME: &'static str = "pbkdf2";

    const SALT_SIZE: usize = 16;
    const LOW_ITERATIONS: u32 = 10_000;
    const HIGH_ITERATIONS: u32 = 600_000;

    fn parse_cost(cost: &str) -> Result<u32, CryptoError> {
        match cost.trim().parse::<u32>() {
            Ok(iterations) if iterations >= 1 => Ok(iterations),
            _ => Err(CryptoError::InvalidCost(cost.to_string())),
        }
    }
}

impl KeyDerivation for Pbkdf2Kdf {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn expected_salt_size(&self) -> usize {
        Self::SALT_SIZE
    }

    fn recommended_cost(&self, cost: CostType) -> String {
        match cost {
            CostType::Low => Self::LOW_ITERATIONS.to_string(),
            CostType::High => Self::HIGH_ITERATIONS.to_string(),
        }
    }

    fn derive(
        &self,
        password: &[u8],
        key_size: usize,
        salt: &[u8],
        cost: &str,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if password.is_empty() {
            return Err(CryptoError::EmptyPassword);
        }
        let iterations = Self::parse_cost(cost)?;

        let mut output = Zeroizing::new(vec![0u8; key_size]);
        pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, iterations, &mut output)
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
        Ok(output)
    }
}

// ===========================================
// Argon2id
// ===========================================

/// Argon2id cost parameters.
///
/// Serialized as `m=<KiB>,t=<iterations>,p=<lanes>`. Parsing accepts the
/// three keys in any order; formatting always writes `m,t,p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Cost {
    /// Memory in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Argon2Cost {
    fn to_argon2_params(self, key_size: usize) -> Result<Params, CryptoError> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(key_size),
        )
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))
    }
}

impl fmt::Display for Argon2Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m={},t={},p={}",
            self.memory_kib, self.iterations, self.parallelism
        )
    }
}

impl FromStr for Argon2Cost {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CryptoError::InvalidCost(s.to_string());

        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let (mut memory, mut iterations, mut parallelism) = (None, None, None);
        for part in parts {
            let (key, value) = part.split_once('=').ok_or_else(invalid)?;
            let value: u32 = value.trim().parse().map_err(|_| invalid())?;
            let slot = match key.trim() {
                "m" => &mut memory,
                "t" => &mut iterations,
                "p" => &mut parallelism,
                _ => return Err(invalid()),
            };
            if slot.replace(value).is_some() {
                return Err(invalid());
            }
        }

        Ok(Self {
            memory_kib: memory.ok_or_else(invalid)?,
            iterations: iterations.ok_or_else(invalid)?,
            parallelism: parallelism.ok_or_else(invalid)?,
        })
    }
}

/// Argon2id, version 0x13.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Kdf;

impl Argon2Kdf {
    /// Registry name.
    pub const NAME: &'static str = "argon2id";

    const SALT_SIZE: usize = 16;

    const LOW: Argon2Cost = Argon2Cost {
        memory_kib: 19 * 1024,
        iterations: 2,
        parallelism: 1,
    };

    const HIGH: Argon2Cost = Argon2Cost {
        memory_kib: 64 * 1024,
        iterations: 3,
        parallelism: 4,
    };
}

impl KeyDerivation for Argon2Kdf {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn expected_salt_size(&self) -> usize {
        Self::SALT_SIZE
    }

    fn recommended_cost(&self, cost: CostType) -> String {
        match cost {
            CostType::Low => Self::LOW.to_string(),
            CostType::High => Self::HIGH.to_string(),
        }
    }

    fn derive(
        &self,
        password: &[u8],
        key_size: usize,
        salt: &[u8],
        cost: &str,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if password.is_empty() {
            return Err(CryptoError::EmptyPassword);
        }
        let params = cost.parse::<Argon2Cost>()?.to_argon2_params(key_size)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut output = Zeroizing::new(vec![0u8; key_size]);
        argon2
            .hash_password_into(password, salt, &mut output)
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
        Ok(output)
    }
}
