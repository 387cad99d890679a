//! Authentication service
//!
//! Orchestrates the credential store, password hasher, and token
//! signer to implement register, login, refresh rotation, and logout.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ProfilePatch, TokenPairResponse, User, UserProfile, UserResponse};
use crate::store::{CredentialStore, StoreError};

use super::jwt::{JwtError, TokenSigner, TokenType, TokenVerifier};
use super::password::{HashError, PasswordHasher};

/// Auth service errors
///
/// Opaque beyond their kind: the transport boundary maps each variant
/// to a status code and a neutral message, and no internal detail ever
/// reaches a caller.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The tenant + email pair already exists
    #[error("identity already registered for this tenant")]
    DuplicateIdentity,

    /// Unknown identity or wrong password; indistinguishable on purpose
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Refresh token failed signature/expiry, or references an unknown
    /// user or a sid with no active session
    #[error("invalid refresh token")]
    InvalidRefresh,

    /// A structurally valid refresh token that was already rotated out;
    /// triggers the all-sessions revoke
    #[error("refresh token reuse detected")]
    ReusedRefresh,

    #[error("credential store error: {0}")]
    Store(String),

    #[error("token signing error: {0}")]
    Signing(String),

    #[error("password hashing error: {0}")]
    Hashing(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateIdentity => AuthError::DuplicateIdentity,
            StoreError::Backend(msg) => AuthError::Store(msg),
        }
    }
}

impl From<HashError> for AuthError {
    fn from(e: HashError) -> Self {
        AuthError::Hashing(e.to_string())
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::InvalidToken => AuthError::InvalidRefresh,
            other => AuthError::Signing(other.to_string()),
        }
    }
}

/// Authentication service
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    signer: TokenSigner,
    verifier: TokenVerifier,
    /// Hash verified against when the identity is unknown, so lookup
    /// misses and password mismatches take comparable time.
    decoy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        signer: TokenSigner,
        verifier: TokenVerifier,
    ) -> Result<Self, AuthError> {
        let decoy_hash = hasher.hash("no-such-identity")?;
        Ok(Self {
            store,
            hasher,
            signer,
            verifier,
            decoy_hash,
        })
    }

    /// Register a new identity within a tenant
    ///
    /// Returns the public projection; fails with `DuplicateIdentity` if
    /// the tenant + email pair already exists.
    pub async fn register(
        &self,
        tenant_id: &str,
        email: &str,
        password: &str,
        profile: Option<ProfilePatch>,
    ) -> Result<UserResponse, AuthError> {
        let email = normalize_email(email);
        let password_hash = self.hasher.hash(password)?;

        let mut user_profile = UserProfile::default();
        if let Some(patch) = profile {
            patch.apply_to(&mut user_profile);
        }

        let user = User::new(tenant_id, &email, password_hash, user_profile);
        let created = self.store.create(user).await?;

        tracing::info!(user_id = %created.id, tenant_id = %created.tenant_id, "user registered");
        Ok(created.into())
    }

    /// Password login; issues a fresh token pair under a new sid
    pub async fn login(
        &self,
        tenant_id: &str,
        email: &str,
        password: &str,
    ) -> Result<TokenPairResponse, AuthError> {
        let email = normalize_email(email);

        let mut user = match self.store.find_by_tenant_and_email(tenant_id, &email).await? {
            Some(user) => user,
            None => {
                let _ = self.hasher.verify(password, &self.decoy_hash);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let sid = Uuid::new_v4();
        let access_token = self.signer.sign_access(&user, sid)?;
        let refresh_token = self.signer.sign_refresh(&user, sid)?;

        let refresh_hash = self.hasher.hash_token(&refresh_token)?;
        user.append_session(sid, refresh_hash);
        self.store.save(user).await?;

        Ok(self.token_pair(access_token, refresh_token))
    }

    /// Exchange a valid refresh token for a new pair, retiring the
    /// spent one
    ///
    /// A structurally valid token that no longer matches the stored
    /// hash for its sid is treated as evidence of theft or replay:
    /// every session the user holds is revoked and the call fails with
    /// `ReusedRefresh`.
    pub async fn rotate_refresh(&self, token: &str) -> Result<TokenPairResponse, AuthError> {
        let claims = self
            .verifier
            .verify_typed(token, TokenType::Refresh)
            .map_err(|_| AuthError::InvalidRefresh)?;
        let user_id = claims.subject().map_err(|_| AuthError::InvalidRefresh)?;

        let mut user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidRefresh)?;

        // Covers both a sid that never existed and one already revoked
        // by a prior rotation or logout.
        let stored_hash = match user.active_session(claims.sid) {
            Some(session) => session.refresh_hash.clone(),
            None => return Err(AuthError::InvalidRefresh),
        };

        let now = Utc::now();
        if !self.hasher.verify_token(token, &stored_hash) {
            // The hash was already rotated past this token: an old,
            // rotated-out token is being replayed.
            tracing::warn!(
                user_id = %user.id,
                sid = %claims.sid,
                "refresh token reuse detected; revoking all sessions"
            );
            user.revoke_all_sessions(now);
            self.store.save(user).await?;
            return Err(AuthError::ReusedRefresh);
        }

        // Rotation proper: retire the spent lineage, chain a new one
        // under a fresh sid. Roles come from the current record, not the
        // old claim, so grants and revocations take effect here.
        user.revoke_session(claims.sid, now);

        let sid = Uuid::new_v4();
        let access_token = self.signer.sign_access(&user, sid)?;
        let refresh_token = self.signer.sign_refresh(&user, sid)?;

        let refresh_hash = self.hasher.hash_token(&refresh_token)?;
        user.append_session(sid, refresh_hash);
        self.store.save(user).await?;

        Ok(self.token_pair(access_token, refresh_token))
    }

    /// Revoke the session identified by `sid`
    ///
    /// Idempotent: a missing user, a missing session, or an
    /// already-revoked session all succeed without error. Outstanding
    /// access tokens stay valid until natural expiry.
    pub async fn logout(&self, user_id: Uuid, sid: Uuid) -> Result<(), AuthError> {
        let Some(mut user) = self.store.find_by_id(user_id).await? else {
            return Ok(());
        };

        if user.revoke_session(sid, Utc::now()) {
            self.store.save(user).await?;
            tracing::info!(user_id = %user_id, sid = %sid, "session revoked");
        }
        Ok(())
    }

    fn token_pair(&self, access_token: String, refresh_token: String) -> TokenPairResponse {
        TokenPairResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.signer.access_ttl_seconds(),
        }
    }
}

/// Identity normalization applied before any lookup or create
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
        assert_eq!(normalize_email("plain@example.com"), "plain@example.com");
    }
}
