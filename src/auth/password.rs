//! Password and refresh-token hashing
//!
//! Wraps bcrypt with a configurable work factor. Refresh tokens are
//! pre-digested with SHA-256 before hashing: bcrypt only reads the
//! first 72 bytes of its input, and two JWTs minted for the same
//! subject share a prefix far longer than that.

use sha2::{Digest, Sha256};
use thiserror::Error;

// bcrypt's supported cost range; the crate keeps these private.
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// Errors produced while creating a hash
///
/// Verification never errors: any failure to parse or recompute a
/// stored hash is reported as a mismatch so callers treat it as
/// "credentials invalid".
#[derive(Error, Debug)]
pub enum HashError {
    #[error("hashing failed: {0}")]
    Backend(String),
}

/// Salted one-way hasher for passwords and refresh tokens
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with the given bcrypt cost factor
    ///
    /// The cost is clamped to bcrypt's supported range so a bad config
    /// value cannot disable the work factor entirely.
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_COST, MAX_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| HashError::Backend(e.to_string()))
    }

    /// Verify a plaintext password against a stored hash
    ///
    /// A malformed stored hash is a mismatch, never a panic or an
    /// error that aborts the caller's flow.
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        bcrypt::verify(plaintext, stored).unwrap_or(false)
    }

    /// Hash a refresh token for at-rest storage
    pub fn hash_token(&self, token: &str) -> Result<String, HashError> {
        self.hash(&digest_token(token))
    }

    /// Verify a presented refresh token against its stored hash
    pub fn verify_token(&self, token: &str, stored: &str) -> bool {
        self.verify(&digest_token(token), stored)
    }
}

/// Fixed-length digest of a token, hex-encoded (64 bytes, under the
/// 72-byte bcrypt input limit)
fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
