//! Wallet management HTTP handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::{AdminPrincipal, AuthenticatedPrincipal};
use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{ConnectWalletRequest, DisconnectWalletRequest, WalletResponse};

/// GET /auth/wallet/challenge - Rotate the caller's nonce and return the text to sign
pub async fn request_challenge(
    State(state): State<AppState>,
    auth: AuthenticatedPrincipal,
) -> Result<String, ApiError> {
    Ok(state.challenges.issue_challenge(auth.reference()).await?)
}

/// PATCH /auth/wallet/connect
pub async fn connect_wallet(
    State(state): State<AppState>,
    auth: AuthenticatedPrincipal,
    payload: Result<Json<ConnectWalletRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    state
        .wallet_linker
        .connect(auth.reference(), &req.address, &req.signed_data, req.mode)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /auth/wallet/disconnect - Unlink one of the caller's wallets.
///
/// Addresses the caller does not own are left alone; the call still succeeds.
pub async fn disconnect_wallet(
    State(state): State<AppState>,
    auth: AuthenticatedPrincipal,
    payload: Result<Json<DisconnectWalletRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    state
        .wallet_linker
        .release(auth.reference(), &req.address)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/wallet - Wallets owned by the caller
pub async fn list_wallets(
    State(state): State<AppState>,
    auth: AuthenticatedPrincipal,
) -> Result<Json<Vec<WalletResponse>>, ApiError> {
    let wallets = state.wallet_linker.list(auth.reference()).await?;
    Ok(Json(wallets.into_iter().map(Into::into).collect()))
}

/// GET /auth/wallet/:address - Admin lookup of a single wallet row
pub async fn get_wallet(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(address): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet = state
        .wallet_linker
        .find(&address)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Wallet {}", address)))?;

    Ok(Json(wallet.into()))
}

/// PATCH /auth/wallet/:address/disconnect - Admin unlink regardless of owner
pub async fn force_disconnect_wallet(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(address): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.wallet_linker.disconnect(&address).await?;

    tracing::info!(admin = %admin.reference(), address = %address, "Wallet unlinked by admin");

    Ok(StatusCode::NO_CONTENT)
}
