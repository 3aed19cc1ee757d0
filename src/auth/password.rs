//! Tagged password hashes.
//!
//! Stored hashes carry an algorithm tag such as `{argon2}$argon2id$v=19$...`. Unknown
//! tags are rejected.

use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
};
use rand::rngs::OsRng;
use thiserror::Error;

pub const ARGON2_TAG: &str = "{argon2}";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("unsupported password hash format")]
    UnsupportedFormat,
    #[error("malformed password hash")]
    MalformedHash,
    #[error("failed to hash password")]
    Hash,
}

pub trait PasswordHasher: Send + Sync + std::fmt::Debug {
    /// # Errors
    /// Returns an error if hashing fails.
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    /// `Ok(false)` on mismatch.
    ///
    /// # Errors
    /// Returns an error if the stored hash has an unknown tag or cannot be parsed.
    fn verify(&self, tagged_hash: &str, plaintext: &str) -> Result<bool, PasswordError>;
}

/// Returns true when `value` starts with a `{tag}` marker, known or not.
#[must_use]
pub fn is_tagged(value: &str) -> bool {
    value.starts_with('{') && value.find('}').is_some_and(|end| end > 1)
}

/// Argon2id with the crate's default parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|_| PasswordError::Hash)?
            .to_string();
        Ok(format!("{ARGON2_TAG}{hash}"))
    }

    fn verify(&self, tagged_hash: &str, plaintext: &str) -> Result<bool, PasswordError> {
        let phc = tagged_hash
            .strip_prefix(ARGON2_TAG)
            .ok_or(PasswordError::UnsupportedFormat)?;
        let parsed = PasswordHash::new(phc).map_err(|_| PasswordError::MalformedHash)?;
        Ok(Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok())
    }
}
