//! Argon2 hashing for the `pw` credential property.
//!
//! Plaintext passwords are hashed before any write and verified against the
//! stored PHC string on login. The hash never leaves this layer.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::client::GraphError;

pub fn hash_password(password: &str) -> Result<String, GraphError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| GraphError::Credential(e.to_string()))
}

/// Check `password` against a stored hash. A malformed hash is an error,
/// a mismatch is `Ok(false)`.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, GraphError> {
    let parsed = PasswordHash::new(stored).map_err(|e| GraphError::Credential(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let err = verify_password("pw", "plaintext-pw").unwrap_err();
        assert!(matches!(err, GraphError::Credential(_)));
    }
}
