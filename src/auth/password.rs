use bcrypt::{hash, verify, BcryptError};
use thiserror::Error;

pub use bcrypt::DEFAULT_COST;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hashing(BcryptError),

    /// The stored digest could not be parsed. This points at a corrupted row,
    /// not at a user typing the wrong password.
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(BcryptError),
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    hash(password, cost).map_err(|e| {
        log::error!("bcrypt hashing failed: {}", e);
        PasswordError::Hashing(e)
    })
}

/// Checks `password` against a stored bcrypt digest.
///
/// A wrong password is `Ok(false)`. `Err` is only returned when the digest itself
/// is unusable.
pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, PasswordError> {
    verify(password, hashed_password).map_err(PasswordError::MalformedHash)
}
