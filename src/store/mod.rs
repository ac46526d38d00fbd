//! Persistence for principals, challenge nonces and wallet links
//!
//! Every mutation here is a single-row atomic statement, so concurrent
//! challenge requests or connects for the same principal resolve as
//! last-write-wins without extra locking.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Principal, PrincipalKind, PrincipalRef, Role, WalletLink};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Failed to run migrations: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Loads and mutates principal records
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Load the current record for a principal
    async fn find_principal(&self, principal: PrincipalRef) -> Result<Option<Principal>, StoreError>;

    /// Look a principal up by display name or email (case-insensitive).
    /// When one account's name equals another's email, the email match wins.
    async fn find_by_login(
        &self,
        kind: PrincipalKind,
        name_or_email: &str,
    ) -> Result<Option<Principal>, StoreError>;

    /// Overwrite the principal's nonce. Returns false if the principal does not exist.
    async fn rotate_nonce(&self, principal: PrincipalRef, nonce: Uuid) -> Result<bool, StoreError>;

    async fn touch_last_login(&self, principal: PrincipalRef) -> Result<(), StoreError>;

    /// Change a user's role. Returns false if no such user exists.
    async fn update_role(&self, user_id: i32, role: Role) -> Result<bool, StoreError>;
}

/// Loads and mutates wallet links
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn find_wallet(&self, address: &str) -> Result<Option<WalletLink>, StoreError>;

    /// Create the row or reassign it to `owner`, refreshing `connected_at`.
    /// An existing label is kept; `label` only fills an empty one.
    async fn upsert_wallet(
        &self,
        address: &str,
        owner: PrincipalRef,
        label: Option<String>,
    ) -> Result<WalletLink, StoreError>;

    /// Null the owner. Unknown or already unowned addresses are a no-op.
    /// Returns whether a row changed.
    async fn clear_wallet_owner(&self, address: &str) -> Result<bool, StoreError>;

    /// Null the owner only while it is still `owner`. Returns whether a row changed.
    async fn release_wallet(&self, address: &str, owner: PrincipalRef) -> Result<bool, StoreError>;

    async fn wallets_for(&self, owner: PrincipalRef) -> Result<Vec<WalletLink>, StoreError>;
}
