//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthService, TokenVerifier};
use crate::users::UsersService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub users_service: Arc<UsersService>,
    pub token_verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(
        auth_service: Arc<AuthService>,
        users_service: Arc<UsersService>,
        token_verifier: Arc<TokenVerifier>,
    ) -> Self {
        Self {
            auth_service,
            users_service,
            token_verifier,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<UsersService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.users_service.clone()
    }
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.token_verifier.clone()
    }
}
