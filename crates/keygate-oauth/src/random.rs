//! Unguessable identifiers for clients, codes and tokens.
//!
//! Values come from the thread-local ChaCha generator (seeded from the OS),
//! encoded as unpadded URL-safe base64.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::rngs::OsRng;
use rand::{RngCore, TryRngCore};

use crate::error::{OAuthError, Result};

/// Entropy for codes, tokens and client secrets (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Entropy for public client identifiers (128 bits).
pub const CLIENT_ID_BYTES: usize = 16;

/// Generate `len` random bytes, base64url-encoded.
pub fn generate(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A fresh authorization code or token value.
pub fn token() -> String {
    generate(TOKEN_BYTES)
}

/// A fresh public client identifier.
pub fn client_id() -> String {
    generate(CLIENT_ID_BYTES)
}

/// A fresh client secret.
pub fn client_secret() -> String {
    generate(TOKEN_BYTES)
}

/// Verify the operating system RNG is usable.
///
/// Called once at service construction. Weak randomness invalidates every
/// credential the service hands out, so callers abort startup on failure.
pub fn self_test() -> Result<()> {
    let mut probe = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut probe)
        .map_err(|e| OAuthError::Randomness(e.to_string()))?;

    // 2^-256 chance of a false positive.
    if probe.iter().all(|b| *b == 0) {
        return Err(OAuthError::Randomness(
            "OS random source returned all-zero output".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_length_and_alphabet() {
        let value = token();
        // 32 bytes -> 43 unpadded base64 characters
        assert_eq!(value.len(), 43);
        assert!(
            value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_client_id_length() {
        assert_eq!(client_id().len(), 22);
    }

    #[test]
    fn test_values_do_not_repeat() {
        let values: HashSet<String> = (0..1000).map(|_| token()).collect();
        assert_eq!(values.len(), 1000);
    }

    #[test]
    fn test_self_test_passes() {
        self_test().unwrap();
    }
}
