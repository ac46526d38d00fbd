//! Authentication models for the Folio auth server

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use validator::Validate;

use super::{PrincipalRef, WalletLink};

/// How the submitted signed data should be interpreted.
///
/// Chosen by the caller, never inferred: the two paths have different trust boundaries.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    /// Detached signature over the raw challenge bytes
    Message,
    /// Signed transaction carrying the challenge as its last instruction's data
    Transaction,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Password login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub name_or_email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Session tokens handed out at login, both carrying the `Bearer ` prefix
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub access_token: String,
    pub refresh_token: String,
}

/// Request to link a wallet to the authenticated principal
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWalletRequest {
    #[validate(length(min = 32, max = 44))]
    pub address: String,
    #[validate(length(min = 1))]
    pub signed_data: String,
    pub mode: VerificationMode,
}

/// Request to unlink a wallet
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectWalletRequest {
    #[validate(length(min = 1, max = 44))]
    pub address: String,
}

/// Wallet list response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub address: String,
    pub owner: Option<PrincipalRef>,
    pub label: Option<String>,
    pub connected_at: DateTime<Utc>,
}

impl From<WalletLink> for WalletResponse {
    fn from(wallet: WalletLink) -> Self {
        Self {
            address: wallet.address,
            owner: wallet.owner,
            label: wallet.label,
            connected_at: wallet.connected_at,
        }
    }
}
