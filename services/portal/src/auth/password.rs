//! Account password hashing.
//!
//! Hashes are Argon2id PHC strings. Hashing is CPU-bound; async
//! callers go through [`hash_password`] and [`verify_password`], which run on
//! the blocking pool.
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use std::sync::OnceLock;
use thiserror::Error;

/// Bounds the work a single login can cause.
pub const MAX_PASSWORD_LENGTH: usize = 512;
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    TooShort,
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    TooLong,
    #[error("password hash: {0}")]
    Hash(argon2::password_hash::Error),
    #[error("password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Length policy applied to new passwords.
pub fn check_policy(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooLong);
    }
    Ok(())
}

fn argon() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

pub fn hash_password_blocking(password: &str) -> Result<String, PasswordError> {
    check_policy(password)?;
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = argon()
        .hash_password(password.as_bytes(), &salt)
        .map_err(PasswordError::Hash)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on a mismatch; `Err` only when the stored hash is unusable.
pub fn verify_password_blocking(password: &str, stored: &str) -> Result<bool, PasswordError> {
    if password.len() > MAX_PASSWORD_LENGTH {
        return Ok(false);
    }
    let parsed = PasswordHash::new(stored).map_err(PasswordError::Hash)?;
    match argon().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(PasswordError::Hash(err)),
    }
}

pub async fn hash_password(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password)).await?
}

pub async fn verify_password(password: String, stored: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &stored)).await?
}

/// Hash of a random secret nobody knows, built with the live parameters.
fn absent_account_hash() -> Option<&'static str> {
    static HASH: OnceLock<Option<String>> = OnceLock::new();
    HASH.get_or_init(|| {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        match hash_password_blocking(&hex::encode(secret)) {
            Ok(hash) => Some(hash),
            Err(err) => {
                tracing::warn!(error = %err, "absent-account hash unavailable");
                None
            }
        }
    })
    .as_deref()
}

/// Spends the same Argon2 work as [`verify_password_blocking`] for an email
/// with no account, then rejects.
pub fn reject_absent_account_blocking(password: &str) -> bool {
    if let Some(stored) = absent_account_hash() {
        let _ = verify_password_blocking(password, stored);
    }
    false
}

pub async fn reject_absent_account(password: String) -> Result<bool, PasswordError> {
    Ok(tokio::task::spawn_blocking(move || reject_absent_account_blocking(&password)).await?)
}
