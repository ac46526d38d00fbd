//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::app_state::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_status = match &state.database {
        Some(database) => match database.ping().await {
            Ok(()) => "connected".to_string(),
            Err(e) => format!("error: {}", e),
        },
        None => "not configured".to_string(),
    };

    let status = if db_status.starts_with("error") {
        "unhealthy"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        database: db_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
