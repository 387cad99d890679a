//! Authentication HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{
    LoginRequest, RefreshTokenRequest, RegisterRequest, TokenPairResponse, UserResponse,
};
use crate::state::AppState;

/// POST /auth/register - Create a new identity within a tenant
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    req.validate()?;

    let user = state
        .auth_service
        .register(&req.tenant_id, &req.email, &req.password, req.profile)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/login - Password login, issues an access/refresh pair
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    req.validate()?;

    let tokens = state
        .auth_service
        .login(&req.tenant_id, &req.email, &req.password)
        .await?;

    Ok(Json(tokens))
}

/// POST /auth/refresh - Rotate a refresh token into a new pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let tokens = state.auth_service.rotate_refresh(&req.refresh_token).await?;

    Ok(Json(tokens))
}

/// POST /auth/logout - Revoke the caller's current session
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.auth_service.logout(user.user_id, user.sid).await?;

    Ok(StatusCode::NO_CONTENT)
}
