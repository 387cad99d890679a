//! Request/response DTOs for the auth and user APIs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{Role, User, UserProfile};

/// Request to register a new identity within a tenant
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[serde(default)]
    pub profile: Option<ProfilePatch>,
}

/// Request for password login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request to exchange a refresh token for a new pair
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Signed token pair returned by login and refresh
#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User projection safe for API responses
///
/// Excludes the password hash and the refresh session set.
#[derive(Debug, Serialize, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub tenant_id: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            email: user.email,
            roles: user.roles,
            profile: user.profile,
            created_at: user.created_at,
        }
    }
}

/// Partial update of profile fields; absent fields are left untouched
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub locale: Option<String>,
    pub picture_url: Option<String>,
    pub time_zone: Option<String>,
}

impl ProfilePatch {
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(name) = &self.name {
            profile.name = Some(name.clone());
        }
        if let Some(locale) = &self.locale {
            profile.locale = Some(locale.clone());
        }
        if let Some(picture_url) = &self.picture_url {
            profile.picture_url = Some(picture_url.clone());
        }
        if let Some(time_zone) = &self.time_zone {
            profile.time_zone = Some(time_zone.clone());
        }
    }
}

/// Pagination query for the tenant user listing
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// Paginated user listing response
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            tenant_id: "acme".into(),
            email: "user@example.com".into(),
            password: "longenough".into(),
            profile: None,
        };
        assert!(ok.validate().is_ok());

        let short_password = RegisterRequest {
            tenant_id: "acme".into(),
            email: "user@example.com".into(),
            password: "short".into(),
            profile: None,
        };
        assert!(short_password.validate().is_err());

        let bad_email = RegisterRequest {
            tenant_id: "acme".into(),
            email: "not-an-email".into(),
            password: "longenough".into(),
            profile: None,
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_user_response_excludes_secrets() {
        let user = User::new("acme", "user@example.com", "hash".into(), UserProfile::default());
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_sessions").is_none());
    }

    #[test]
    fn test_profile_patch_merges_only_present_fields() {
        let mut profile = UserProfile {
            name: Some("Ada".into()),
            locale: Some("en".into()),
            ..Default::default()
        };
        let patch = ProfilePatch {
            locale: Some("es".into()),
            time_zone: Some("Europe/Madrid".into()),
            ..Default::default()
        };
        patch.apply_to(&mut profile);

        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert_eq!(profile.locale.as_deref(), Some("es"));
        assert_eq!(profile.time_zone.as_deref(), Some("Europe/Madrid"));
    }
}
