//! Session signing key material.
//!
//! # Purpose
//! Produce the Ed25519 key the portal signs session tokens with, either from a
//! configured hex seed or freshly generated at startup.
//!
//! # Key invariants
//! - The private key is a raw 32-byte Ed25519 seed; the public key is always
//!   derived from it, never configured separately.
//! - Generated keys do not survive a restart, so sessions minted before it
//!   stop verifying. Configure a seed to keep sessions across restarts.
use ed25519_dalek::SigningKey;
use rand::RngCore;
use thiserror::Error;

pub const ED25519_SEED_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("session seed is not valid hex: {0}")]
    Hex(String),
    #[error("session seed must be {ED25519_SEED_LEN} bytes, got {0}")]
    Length(usize),
}

#[derive(Clone)]
pub struct SessionKeys {
    pub kid: String,
    pub private_key: [u8; ED25519_SEED_LEN],
    pub public_key: [u8; ED25519_SEED_LEN],
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("kid", &self.kid)
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    pub fn from_seed(seed: [u8; ED25519_SEED_LEN]) -> Self {
        let public_key = SigningKey::from_bytes(&seed).verifying_key().to_bytes();
        // Derived from the public key so a configured seed keeps a stable kid.
        let kid = hex::encode(&public_key[..8]);
        Self {
            kid,
            private_key: seed,
            public_key,
        }
    }

    pub fn generate() -> Self {
        let mut seed = [0u8; ED25519_SEED_LEN];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    pub fn from_hex(seed: &str) -> Result<Self, SeedError> {
        let bytes = hex::decode(seed.trim()).map_err(|err| SeedError::Hex(err.to_string()))?;
        let seed: [u8; ED25519_SEED_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| SeedError::Length(bytes.len()))?;
        Ok(Self::from_seed(seed))
    }

    /// Keys from the configured seed, or fresh ones when none is configured.
    pub fn from_config(seed: Option<&str>) -> Result<Self, SeedError> {
        match seed {
            Some(seed) => Self::from_hex(seed),
            None => {
                tracing::warn!("no session seed configured; sessions will not survive a restart");
                Ok(Self::generate())
            }
        }
    }
}
