//! Credential hashing.
//!
//! Argon2id with a per-call random salt, emitted as a PHC string so the salt
//! and cost parameters travel with the hash. The work factor is the Argon2
//! iteration count. At the default (2 iterations, 19 MiB) one hash takes
//! roughly 50-250 ms on server hardware in release builds; request deadlines
//! must leave room for at least one.

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use super::errors::AuthError;

const TIMING_DUMMY: &str = "timing-equalizer-not-a-password";

#[derive(Clone)]
pub struct CredentialHasher {
    argon: Argon2<'static>,
    work_factor: u32,
    // Verified against when the account does not exist.
    dummy_hash: Arc<str>,
}

impl CredentialHasher {
    pub const DEFAULT_WORK_FACTOR: u32 = Params::DEFAULT_T_COST;
    pub const DEFAULT_MEMORY_KIB: u32 = Params::DEFAULT_M_COST;

    /// Build a hasher with `work_factor` iterations over `memory_kib` KiB.
    ///
    /// Computes one hash up front, so construction costs as much as a login.
    pub fn new(work_factor: u32, memory_kib: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, work_factor, Params::DEFAULT_P_COST, None)
            .map_err(|e| AuthError::Hash(format!("invalid argon2 parameters: {e}")))?;
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let mut hasher = Self { argon, work_factor, dummy_hash: Arc::from("") };
        hasher.dummy_hash = Arc::from(hasher.hash(TIMING_DUMMY)?);
        Ok(hasher)
    }

    pub fn work_factor(&self) -> u32 {
        self.work_factor
    }

    /// Salted one-way hash of `plaintext`.
    ///
    /// Only fails if the parameters are unusable or the OS entropy source
    /// breaks; callers treat that as an internal error.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| {
                error!(error = %e, "password hashing failed");
                AuthError::Hash(e.to_string())
            })
    }

    /// Constant-time check of `plaintext` against a stored PHC hash.
    ///
    /// Malformed hashes verify as `false`. Parameters are read from the hash,
    /// so hashes made under an older work factor keep verifying.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon.verify_password(plaintext.as_bytes(), &parsed).is_ok()
    }

    /// Burn one verification so a miss costs the same as a wrong password.
    pub fn verify_dummy(&self, plaintext: &str) -> bool {
        let _ = self.verify(plaintext, &self.dummy_hash);
        false
    }

    /// [`Self::hash`] on the blocking pool. The plaintext is dropped there.
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("hash task failed: {e}")))?
    }

    /// [`Self::verify`] on the blocking pool. `None` hash runs the dummy check.
    pub async fn verify_blocking(&self, plaintext: String, hash: Option<String>) -> Result<bool, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || match hash {
            Some(h) => hasher.verify(&plaintext, &h),
            None => hasher.verify_dummy(&plaintext),
        })
        .await
        .map_err(|e| AuthError::Internal(format!("verify task failed: {e}")))
    }
}
