//! Password hashing with Argon2id.
//!
//! Verification runs in constant time with respect to the supplied password
//! (the PHC hash carries its own salt and parameters).

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HashError {
    #[error("password hashing failed: {0}")]
    HashingFailed(String),
    #[error("invalid password hash format")]
    InvalidHashFormat,
}

/// Argon2id hasher with OWASP-recommended parameters
/// (m=19456 KiB, t=2, p=1).
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        // Hardcoded constants that are always valid; failure would indicate
        // a bug in the argon2 crate, not a runtime condition.
        let params = Params::new(19456, 2, 1, None).expect("Argon2 parameters are valid constants");
        Self { params }
    }

    /// Custom parameters, mainly for cheap test hashing.
    ///
    /// # Errors
    /// Returns an error if the parameters are rejected by the argon2 crate.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|err| HashError::HashingFailed(format!("invalid parameters: {err}")))?;
        Ok(Self { params })
    }

    /// Hash a password into a PHC-formatted string with a fresh salt.
    ///
    /// # Errors
    /// Returns `HashError::HashingFailed` if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| HashError::HashingFailed(err.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC hash.
    ///
    /// Returns `Ok(false)` on mismatch; errors only on malformed hashes.
    ///
    /// # Errors
    /// Returns `HashError::InvalidHashFormat` if the stored hash cannot be parsed.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(hash).map_err(|_| HashError::InvalidHashFormat)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        match argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        // Small parameters keep the test suite quick.
        PasswordHasher::with_params(4096, 1, 1).expect("valid test parameters")
    }

    #[test]
    fn hash_produces_argon2id_phc_string() {
        let hash = fast_hasher().hash("hunter2hunter2").expect("hash");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn verify_accepts_correct_password() {
        let hasher = fast_hasher();
        let hash = hasher.hash("correct horse").expect("hash");
        assert!(hasher.verify("correct horse", &hash).expect("verify"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hasher = fast_hasher();
        let hash = hasher.hash("correct horse").expect("hash");
        assert!(!hasher.verify("battery staple", &hash).expect("verify"));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        let result = fast_hasher().verify("anything", "not-a-phc-hash");
        assert!(matches!(result, Err(HashError::InvalidHashFormat)));
    }

    #[test]
    fn same_password_hashes_differently() {
        let hasher = fast_hasher();
        let first = hasher.hash("repeatable").expect("hash");
        let second = hasher.hash("repeatable").expect("hash");
        assert_ne!(first, second);
        assert!(hasher.verify("repeatable", &first).expect("verify"));
        assert!(hasher.verify("repeatable", &second).expect("verify"));
    }
}
