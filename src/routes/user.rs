//! User routes

use axum::{
    routing::{get, patch},
    Router,
};

use crate::handlers::user;
use crate::state::AppState;

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(user::get_me))
        .route("/users/me", patch(user::update_me))
        .route("/users", get(user::list_users))
}
