use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use crate::app::AppError;

/// Hashes a raw password with a fresh random salt. The produced string
/// embeds algorithm, parameters and salt, so it carries everything needed
/// to verify it later.
pub fn hash(raw: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hashed| hashed.to_string())
        .map_err(|_| AppError::InternalServerError)
}

/// Checks a raw password against a stored hash in constant time. A stored
/// value that does not parse as a hash counts as a mismatch.
pub fn verify(raw: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
