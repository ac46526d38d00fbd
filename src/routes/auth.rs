//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::auth;

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/user/login", post(auth::login_user))
        .route("/auth/creator/login", post(auth::login_creator))
        .route("/auth/user/refresh-token/:token", get(auth::refresh_user))
        .route("/auth/creator/refresh-token/:token", get(auth::refresh_creator))
        .route("/auth/me", get(auth::me))
}
