//! Generation policy for opaque secrets (session tokens, security tokens,
//! OAuth state values): 256 bits from the OS CSPRNG, URL-safe base64 without
//! padding. Secrets are never persisted; stores hold the SHA-256 digest.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Generate a fresh opaque secret.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex-encoded SHA-256 digest of a secret, the only form ever stored or
/// logged.
pub fn digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time digest comparison.
pub fn digest_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_url_safe_and_unpadded() {
        let secret = generate_secret();
        // 32 bytes -> 43 base64url chars, no padding.
        assert_eq!(secret.len(), 43);
        assert!(secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn secrets_do_not_repeat() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_deterministic_and_hex() {
        let secret = generate_secret();
        let d1 = digest(&secret);
        let d2 = digest(&secret);
        assert_eq!(d1, d2);
        assert_eq!(d1.len(), 64);
        assert!(digest_eq(&d1, &d2));
        assert!(!digest_eq(&d1, &digest("other")));
    }
}
