//! Authentication middleware
//!
//! Bearer-token verification and principal extraction. Verification
//! only needs the public key, so no signing material lives here, and
//! no store round-trip happens: revoking a session does not recall
//! outstanding access tokens, which stay valid until their short TTL
//! expires.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{TokenType, TokenVerifier};
use crate::models::Role;

/// Authenticated principal extracted from a verified access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub tenant_id: String,
    pub roles: Vec<Role>,
    pub sid: Uuid,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Error response for authentication failures
#[derive(Debug, Serialize)]
struct AuthRejection {
    error: AuthRejectionDetails,
}

#[derive(Debug, Serialize)]
struct AuthRejectionDetails {
    code: String,
    message: String,
}

impl AuthRejection {
    fn new(code: &str, message: &str) -> Self {
        Self {
            error: AuthRejectionDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }

    fn unauthorized(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }

    fn forbidden(self) -> Response {
        (StatusCode::FORBIDDEN, Json(self)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AuthRejection::new(
                        "MISSING_TOKEN",
                        "Authorization header with Bearer token required",
                    )
                    .unauthorized()
                })?;

        let verifier = Arc::<TokenVerifier>::from_ref(state);

        // Expired and tampered tokens are rejected identically.
        let claims = verifier
            .verify_typed(bearer.token(), TokenType::Access)
            .map_err(|_| AuthRejection::new("INVALID_TOKEN", "Invalid token").unauthorized())?;

        let user_id = claims
            .subject()
            .map_err(|_| AuthRejection::new("INVALID_TOKEN", "Invalid token").unauthorized())?;

        Ok(AuthenticatedUser {
            user_id,
            tenant_id: claims.tenant_id,
            roles: claims.roles.unwrap_or_default(),
            sid: claims.sid,
        })
    }
}

/// Extractor requiring the `admin` role
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.has_role(Role::Admin) {
            return Err(AuthRejection::new("FORBIDDEN", "Admin access required").forbidden());
        }

        Ok(AdminUser(user))
    }
}
