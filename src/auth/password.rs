//! Argon2id password hashing.
//!
//! Hashes are stored as PHC strings, so salt and parameters travel with them.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn validate_password_length(password: &str, min_length: u64) -> Result<(), String> {
    if (password.chars().count() as u64) < min_length {
        return Err(format!("Password must be at least {min_length} characters"));
    }
    Ok(())
}
