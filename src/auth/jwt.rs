//! RS256 token signing and verification
//!
//! Access and refresh tokens share the signing mechanism but carry
//! different claim shapes and TTLs. Signing uses the private key;
//! verification only needs the public key, so [`TokenVerifier`] can
//! live in components that never hold signing material.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Role, User};

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("token encoding failed: {0}")]
    EncodingFailed(String),

    /// Expired, tampered, or otherwise unusable. Deliberately carries
    /// no detail about which check failed.
    #[error("invalid token")]
    InvalidToken,
}

/// Claim set embedded in signed tokens
///
/// Access tokens carry `roles`; refresh tokens do not, so roles are
/// re-derived from the stored user at rotation time and role changes
/// take effect on the next rotation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Tenant the subject belongs to
    pub tenant_id: String,
    /// Roles, access tokens only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
    /// Session ID correlating this token pair and its rotation lineage
    pub sid: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Token type (access or refresh)
    pub token_type: String,
}

impl Claims {
    /// Parse the subject claim as a user ID
    pub fn subject(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidToken)
    }
}

/// Token type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Issues signed access/refresh tokens with configured TTLs
pub struct TokenSigner {
    encoding: EncodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenSigner {
    /// Build a signer from a PEM-encoded RSA private key
    pub fn from_pem(
        private_key_pem: &[u8],
        access_ttl_seconds: i64,
        refresh_ttl_days: i64,
    ) -> Result<Self, JwtError> {
        let encoding = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| JwtError::InvalidKey(e.to_string()))?;
        Ok(Self {
            encoding,
            access_ttl: Duration::seconds(access_ttl_seconds),
            refresh_ttl: Duration::days(refresh_ttl_days),
        })
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Sign a short-lived access token carrying the user's roles
    pub fn sign_access(&self, user: &User, sid: Uuid) -> Result<String, JwtError> {
        self.sign(user, sid, Some(user.roles.clone()), self.access_ttl, TokenType::Access)
    }

    /// Sign a long-lived refresh token (no roles)
    pub fn sign_refresh(&self, user: &User, sid: Uuid) -> Result<String, JwtError> {
        self.sign(user, sid, None, self.refresh_ttl, TokenType::Refresh)
    }

    fn sign(
        &self,
        user: &User,
        sid: Uuid,
        roles: Option<Vec<Role>>,
        ttl: Duration,
        token_type: TokenType,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            tenant_id: user.tenant_id.clone(),
            roles,
            sid,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            token_type: token_type.as_str().to_string(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }
}

/// Verifies signed tokens against the public key
#[derive(Clone)]
pub struct TokenVerifier {
    decoding: DecodingKey,
}

impl TokenVerifier {
    /// Build a verifier from a PEM-encoded RSA public key
    pub fn from_pem(public_key_pem: &[u8]) -> Result<Self, JwtError> {
        let decoding = DecodingKey::from_rsa_pem(public_key_pem)
            .map_err(|e| JwtError::InvalidKey(e.to_string()))?;
        Ok(Self { decoding })
    }

    /// Verify signature and expiry, returning the claim set
    ///
    /// Every failure collapses to [`JwtError::InvalidToken`] so callers
    /// cannot tell an expired token from a tampered one.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| JwtError::InvalidToken)
    }

    /// Verify a token and require the expected type claim
    pub fn verify_typed(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let claims = self.verify(token)?;
        if claims.token_type != expected.as_str() {
            return Err(JwtError::InvalidToken);
        }
        Ok(claims)
    }
}
