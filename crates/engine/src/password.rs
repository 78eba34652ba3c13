//! Argon2id password hashing and verification.
//!
//! Hashes use the PHC string format so algorithm parameters and salt travel
//! with the hash.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use bazaar_core::error::CoreError;

use crate::error::{EngineError, EngineResult};

/// Hash a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> EngineResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| EngineError::Password(e.to_string()))
}

/// Verify a plaintext password against a stored PHC hash.
///
/// Returns `Ok(false)` for a wrong password. A malformed stored hash is an
/// error, not a mismatch.
pub fn verify_password(password: &str, hash: &str) -> EngineResult<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| EngineError::Password(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(EngineError::Password(e.to_string())),
    }
}

/// Run one verification against a throwaway hash and report a mismatch.
///
/// Used when the account does not exist, so an unknown username costs the
/// same Argon2 work as a wrong password.
pub fn verify_against_dummy(password: &str) -> EngineResult<bool> {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    let hash = match DUMMY_HASH.get() {
        Some(hash) => hash,
        None => {
            let fresh = hash_password("bazaar-dummy-credential")?;
            DUMMY_HASH.get_or_init(|| fresh)
        }
    };
    verify_password(password, hash)?;
    Ok(false)
}

/// Enforce the configured minimum length.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), CoreError> {
    if password.chars().count() < min_length {
        return Err(CoreError::Validation(format!(
            "Password must be at least {min_length} characters long"
        )));
    }
    Ok(())
}
