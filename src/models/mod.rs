//! Data models for the campus auth backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// Role assigned to a user within its tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

/// Optional display profile attached to a user
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// One refresh-token lineage entry owned by a user
///
/// Entries are append-only; revocation is a state transition, never a
/// deletion, so the full rotation history stays available for replay
/// detection.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshSession {
    pub sid: Uuid,
    pub refresh_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshSession {
    pub fn new(sid: Uuid, refresh_hash: String) -> Self {
        Self {
            sid,
            refresh_hash,
            created_at: Utc::now(),
            revoked_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// User record; one principal scoped to exactly one tenant
///
/// `tenant_id` + `email` is unique across the store. The password hash
/// and the session set never leave the store/service boundary; API
/// responses use [`UserResponse`] instead.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub profile: UserProfile,
    pub is_active: bool,
    pub email_verified: bool,
    pub refresh_sessions: Vec<RefreshSession>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with the default `student` role and no sessions
    pub fn new(tenant_id: &str, email: &str, password_hash: String, profile: UserProfile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            email: email.to_string(),
            password_hash,
            roles: vec![Role::Student],
            profile,
            is_active: true,
            email_verified: false,
            refresh_sessions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Find the session for `sid` that has not been revoked
    ///
    /// At most one per sid can ever be active: sids are random and a
    /// revoked session never transitions back.
    pub fn active_session(&self, sid: Uuid) -> Option<&RefreshSession> {
        self.refresh_sessions
            .iter()
            .find(|s| s.sid == sid && s.is_active())
    }

    /// Start a new lineage entry for `sid` with the given token hash
    pub fn append_session(&mut self, sid: Uuid, refresh_hash: String) {
        self.refresh_sessions
            .push(RefreshSession::new(sid, refresh_hash));
        self.updated_at = Utc::now();
    }

    /// Revoke the active session for `sid`, if any
    ///
    /// Returns whether anything changed. Already-revoked sessions keep
    /// their original `revoked_at`, which makes logout idempotent.
    pub fn revoke_session(&mut self, sid: Uuid, at: DateTime<Utc>) -> bool {
        let mut changed = false;
        for session in &mut self.refresh_sessions {
            if session.sid == sid && session.revoked_at.is_none() {
                session.revoked_at = Some(at);
                changed = true;
            }
        }
        if changed {
            self.updated_at = at;
        }
        changed
    }

    /// Revoke every session that is still active
    ///
    /// This is the fail-secure response to refresh-token reuse: one
    /// replayed token invalidates the whole session set.
    pub fn revoke_all_sessions(&mut self, at: DateTime<Utc>) {
        for session in &mut self.refresh_sessions {
            if session.revoked_at.is_none() {
                session.revoked_at = Some(at);
            }
        }
        self.updated_at = at;
    }

    pub fn active_session_count(&self) -> usize {
        self.refresh_sessions
            .iter()
            .filter(|s| s.is_active())
            .count()
    }
}
