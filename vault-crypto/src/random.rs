//! Random material for salts, nonces and keys.

use zeroize::Zeroizing;

use crate::cipher::KEY_SIZE;
use crate::error::CryptoError;

/// Fill a fresh buffer of `len` bytes from the OS random source.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, CryptoError> {
    let mut bytes = vec![0u8; len];
    getrandom::getrandom(&mut bytes).map_err(|e| CryptoError::Random(e.to_string()))?;
    Ok(bytes)
}

/// Generate a random 256-bit key, zeroed on drop.
pub fn random_key() -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    random_bytes(KEY_SIZE).map(Zeroizing::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_have_requested_length() {
        assert_eq!(random_bytes(0).unwrap().len(), 0);
        assert_eq!(random_bytes(24).unwrap().len(), 24);
    }

    #[test]
    fn random_keys_differ() {
        let a = random_key().unwrap();
        let b = random_key().unwrap();
        assert_eq!(a.len(), KEY_SIZE);
        assert_ne!(*a, *b);
    }
}
