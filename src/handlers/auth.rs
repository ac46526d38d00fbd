//! Authentication HTTP handlers
//!
//! Password login and access token renewal for both principal kinds.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use validator::Validate;

use super::AuthenticatedPrincipal;
use crate::app_state::AppState;
use crate::auth::Claims;
use crate::error::ApiError;
use crate::models::{Authorization, LoginRequest, PrincipalKind};

/// POST /auth/user/login
pub async fn login_user(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Authorization>, ApiError> {
    login(state, PrincipalKind::User, payload).await
}

/// POST /auth/creator/login
pub async fn login_creator(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Authorization>, ApiError> {
    login(state, PrincipalKind::Creator, payload).await
}

async fn login(
    state: AppState,
    kind: PrincipalKind,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Authorization>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let authorization = state
        .auth_service
        .login(kind, &req.name_or_email, &req.password)
        .await?;

    Ok(Json(authorization))
}

/// GET /auth/user/refresh-token/:token - Returns a bare access token
pub async fn refresh_user(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<String, ApiError> {
    Ok(state
        .auth_service
        .refresh_as(PrincipalKind::User, &token)
        .await?)
}

/// GET /auth/creator/refresh-token/:token - Returns a bare access token
pub async fn refresh_creator(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<String, ApiError> {
    Ok(state
        .auth_service
        .refresh_as(PrincipalKind::Creator, &token)
        .await?)
}

/// GET /auth/me - Claims of the calling principal, as currently stored
pub async fn me(auth: AuthenticatedPrincipal) -> Json<Claims> {
    Json(auth.claims)
}
