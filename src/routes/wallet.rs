//! Wallet management routes

use axum::{
    routing::{get, patch},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::wallet;

/// Create wallet management routes
pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/wallet", get(wallet::list_wallets))
        .route("/auth/wallet/challenge", get(wallet::request_challenge))
        .route("/auth/wallet/connect", patch(wallet::connect_wallet))
        .route("/auth/wallet/disconnect", patch(wallet::disconnect_wallet))
        .route("/auth/wallet/:address", get(wallet::get_wallet))
        .route(
            "/auth/wallet/:address/disconnect",
            patch(wallet::force_disconnect_wallet),
        )
}
