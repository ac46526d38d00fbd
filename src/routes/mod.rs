//! Route definitions for the Folio auth API

mod auth;
mod wallet;

use axum::{routing::get, Router};

use crate::app_state::AppState;
use crate::handlers;
use crate::middleware;

pub use auth::auth_routes;
pub use wallet::wallet_routes;

/// Every route plus request tracing. CORS is layered on by the binary.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(auth_routes())
        .merge(wallet_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}
