//! User profile and admin HTTP handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::{ListUsersQuery, ProfilePatch, UserListResponse, UserResponse};
use crate::state::AppState;

/// GET /users/me - Current user projection
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let me = state
        .users_service
        .get_me(user.user_id, &user.tenant_id)
        .await?;

    Ok(Json(me))
}

/// PATCH /users/me - Merge-patch profile fields
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<UserResponse>, ApiError> {
    let me = state
        .users_service
        .update_me(user.user_id, &user.tenant_id, patch)
        .await?;

    Ok(Json(me))
}

/// GET /users - Paginated listing of the caller's tenant (admin only)
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    let listing = state
        .users_service
        .list_users(&admin.tenant_id, query)
        .await?;

    Ok(Json(listing))
}
