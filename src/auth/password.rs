//! Credential hashing.
//!
//! Argon2id with a fixed parameter set taken from configuration. Hashes are
//! PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$key`), so verification
//! reads its parameters from the stored string and old hashes keep working
//! after the configured parameters change.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use super::error::HashError;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Time cost (passes)
    pub iterations: u32,
    /// Lanes
    pub parallelism: u32,
    /// Derived key length in bytes
    pub output_len: usize,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 1,
            parallelism: 2,
            output_len: 32,
        }
    }
}

/// One-way password hasher.
///
/// Cheap to clone; clones share no state, so a copy can be moved onto a
/// blocking thread for the CPU-heavy work.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    /// Build a hasher. Fails if the parameter set is rejected by argon2.
    pub fn new(params: PasswordParams) -> Result<Self, HashError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            Some(params.output_len),
        )
        .map_err(|e| HashError::Internal(format!("invalid argon2 params: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        let mut salt_bytes = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| HashError::Internal(format!("entropy source failed: {}", e)))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| HashError::Internal(e.to_string()))?;

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| HashError::Internal(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Check a password against a stored hash.
    ///
    /// `Ok(false)` on mismatch. `Err` only when `hash` is not a usable PHC string.
    /// The derived-key comparison inside argon2 is constant time.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(hash).map_err(|e| HashError::Malformed(e.to_string()))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError::Malformed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> CredentialHasher {
        CredentialHasher::new(PasswordParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
            output_len: 32,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("supersecret").unwrap();

        assert!(hash.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert!(hasher.verify("supersecret", &hash).unwrap());
        assert!(!hasher.verify("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let hasher = fast_hasher();
        let a = hasher.hash("hunter2").unwrap();
        let b = hasher.hash("hunter2").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("hunter2", &a).unwrap());
        assert!(hasher.verify("hunter2", &b).unwrap());
    }

    #[test]
    fn test_empty_password_is_hashable() {
        let hasher = fast_hasher();
        let hash = hasher.hash("").unwrap();
        assert!(hasher.verify("", &hash).unwrap());
        assert!(!hasher.verify(" ", &hash).unwrap());
    }

    #[test]
    fn test_verify_uses_params_from_hash_string() {
        // Hash produced under one parameter set still verifies with a hasher
        // configured differently.
        let old = fast_hasher();
        let hash = old.hash("rotate-me").unwrap();

        let new = CredentialHasher::new(PasswordParams {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
            output_len: 32,
        })
        .unwrap();
        assert!(new.verify("rotate-me", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let hasher = fast_hasher();
        assert!(matches!(
            hasher.verify("pw", "not-a-phc-string"),
            Err(HashError::Malformed(_))
        ));
        assert!(matches!(hasher.verify("pw", ""), Err(HashError::Malformed(_))));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let res = CredentialHasher::new(PasswordParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
            output_len: 32,
        });
        assert!(matches!(res, Err(HashError::Internal(_))));
    }
}
