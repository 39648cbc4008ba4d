//! Password hashing using argon2
//!
//! New hashes are Argon2id PHC strings. Verification also accepts bcrypt
//! hashes (`$2a$`, `$2b$`, `$2y$`) carried over from older accounts.
//!
//! # Performance Considerations
//!
//! Argon2 is intentionally CPU-intensive. Async callers should use the
//! `*_async` variants, which run on the blocking thread pool.

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::warn;

/// Password hashing service
///
/// Uses Argon2id which is the recommended variant for password hashing.
pub struct PasswordService;

impl PasswordService {
    /// Hash a password using argon2 (blocking operation)
    ///
    /// Every call uses a fresh random salt, so hashing the same plaintext
    /// twice yields different strings that both verify.
    pub fn hash(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    /// Hash a password asynchronously (non-blocking)
    pub async fn hash_async(password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || Self::hash(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Verify a password against a stored hash (blocking operation)
    ///
    /// Never fails: a malformed or unsupported hash verifies as `false`, so
    /// callers cannot tell a corrupt hash from a wrong password.
    pub fn verify(password: &str, hash: &str) -> bool {
        if is_bcrypt_hash(hash) {
            return bcrypt::verify(password, hash).unwrap_or(false);
        }

        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Verify a password asynchronously (non-blocking)
    pub async fn verify_async(password: String, hash: String) -> bool {
        match tokio::task::spawn_blocking(move || Self::verify(&password, &hash)).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "password verification task failed");
                false
            }
        }
    }
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}
