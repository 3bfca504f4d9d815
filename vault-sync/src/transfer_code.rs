//! Transfer codes.
//!
//! A transfer code is the password every device uses to decrypt the cloud
//! repository. It is generated once by the first device that uploads and
//! typed in by the user on every other device.

use vault_crypto::{random_bytes, CryptoError};

/// Characters used in transfer codes. Omits `0 1 l o` which are easily
/// confused when read aloud or typed.
const ALPHABET: &[u8; 32] = b"abcdefghijkmnpqrstuvwxyz23456789";

/// Characters in a code, not counting separators.
pub const TRANSFER_CODE_LENGTH: usize = 16;

const GROUP: usize = 4;

/// Generate a new transfer code formatted as `xxxx-xxxx-xxxx-xxxx`.
pub fn generate_transfer_code() -> Result<String, CryptoError> {
    let bytes = random_bytes(TRANSFER_CODE_LENGTH)?;
    // 256 is a multiple of 32, so the modulo is unbiased.
    let raw: String = bytes
        .iter()
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect();
    Ok(format_transfer_code(&raw))
}

/// Strip separators and whitespace and lowercase user input.
pub fn normalize_transfer_code(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Group a code into blocks of four for display.
pub fn format_transfer_code(code: &str) -> String {
    let normalized = normalize_transfer_code(code);
    normalized
        .as_bytes()
        .chunks(GROUP)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_shape() {
        let code = generate_transfer_code().unwrap();
        assert_eq!(code.len(), TRANSFER_CODE_LENGTH + 3);
        let groups: Vec<&str> = code.split('-').collect();
        assert_eq!(groups.len(), 4);
        assert!(groups.iter().all(|g| g.len() == 4));
        assert!(normalize_transfer_code(&code)
            .bytes()
            .all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn generated_codes_differ() {
        assert_ne!(
            generate_transfer_code().unwrap(),
            generate_transfer_code().unwrap()
        );
    }

    #[test]
    fn normalize_accepts_sloppy_input() {
        assert_eq!(
            normalize_transfer_code("  ABCD-efgh ijkm\tNPQR "),
            "abcdefghijkmnpqr"
        );
    }

    #[test]
    fn format_groups_by_four() {
        assert_eq!(format_transfer_code("abcdefghijkmnpqr"), "abcd-efgh-ijkm-npqr");
        assert_eq!(format_transfer_code("abc-defg-h"), "abcd-efgh");
    }
}
