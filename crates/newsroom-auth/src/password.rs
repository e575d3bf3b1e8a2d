//! Password hashing with Argon2id.
//!
//! Hashes are PHC strings, so the algorithm, version, work factor and salt
//! travel with every stored hash.

use crate::error::AuthError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// OWASP 2024 Argon2id memory cost in KiB.
pub const DEFAULT_MEMORY_KIB: u32 = 19456;

/// OWASP 2024 Argon2id iteration count.
pub const DEFAULT_ITERATIONS: u32 = 2;

/// OWASP 2024 Argon2id parallelism.
pub const DEFAULT_PARALLELISM: u32 = 1;

/// One-way password hashing and verification.
///
/// Cheap to clone; holds only the work-factor parameters.
#[derive(Debug, Clone)]
pub struct PasswordVault {
    params: Params,
}

impl Default for PasswordVault {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordVault {
    /// Create a vault with the OWASP-recommended work factor
    /// (m=19456 KiB, t=2, p=1).
    #[must_use]
    pub fn new() -> Self {
        // Constant parameters; failure here would be a bug in the argon2 crate.
        let params = Params::new(
            DEFAULT_MEMORY_KIB,
            DEFAULT_ITERATIONS,
            DEFAULT_PARALLELISM,
            None,
        )
        .expect("OWASP 2024 Argon2 parameters are valid constants");

        Self { params }
    }

    /// Create a vault with a custom work factor.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::HashingFailed` if argon2 rejects the parameters.
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::HashingFailed(format!("Invalid parameters: {e}")))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    ///
    /// The same input never produces the same output twice.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::HashingFailed` if the primitive fails.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashingFailed(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC hash.
    ///
    /// The parameters embedded in the hash are used, not the vault's own, so
    /// hashes created under an older work factor still verify. Any malformed
    /// hash yields `false`.
    #[must_use]
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            tracing::debug!("Stored password hash is not a valid PHC string");
            return false;
        };

        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
