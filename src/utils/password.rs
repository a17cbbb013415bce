use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AuthError;

/// Newtype for plaintext passwords so they cannot end up in logs by accident.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Hash a password with Argon2id. The salt is generated here and encoded
/// into the resulting PHC string.
pub fn hash_password(password: &Password) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

/// Verify a password against a stored PHC hash. Argon2 verification is
/// constant-time in the comparison; a malformed stored hash is an internal
/// error, a mismatch is `Ok(false)`.
pub fn verify_password(password: &Password, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AuthError::Internal(anyhow::anyhow!("invalid stored password hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let password = Password::new("correct horse battery staple");
        let hash = hash_password(&password).unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&password, &hash).unwrap());
        assert!(!verify_password(&Password::new("wrong"), &hash).unwrap());
    }

    #[test]
    fn same_password_different_salts() {
        let password = Password::new("secret1");
        let h1 = hash_password(&password).unwrap();
        let h2 = hash_password(&password).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn garbage_hash_is_internal_error() {
        let err = verify_password(&Password::new("x"), "not-a-phc-string").unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }

    #[test]
    fn debug_output_is_redacted() {
        let rendered = format!("{:?}", Password::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
