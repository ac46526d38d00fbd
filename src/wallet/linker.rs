//! Wallet linking
//!
//! A wallet is linked only after its ownership proof verifies against the
//! principal's live challenge. Rows are never deleted; unlinking clears the
//! owner so the address history and label survive.

use std::sync::Arc;
use thiserror::Error;

use crate::auth::{SignatureVerifier, VerificationError};
use crate::models::{PrincipalRef, VerificationMode, WalletLink};
use crate::store::{StoreError, WalletStore};

use super::events::{WalletEvent, WalletEvents};
use super::label::LabelResolver;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Clone)]
pub struct WalletLinker {
    verifier: SignatureVerifier,
    wallets: Arc<dyn WalletStore>,
    labels: Arc<dyn LabelResolver>,
    events: WalletEvents,
}

impl WalletLinker {
    pub fn new(
        verifier: SignatureVerifier,
        wallets: Arc<dyn WalletStore>,
        labels: Arc<dyn LabelResolver>,
        events: WalletEvents,
    ) -> Self {
        Self {
            verifier,
            wallets,
            labels,
            events,
        }
    }

    /// Verify the ownership proof and link `address` to `principal`.
    ///
    /// Nothing is written when verification fails.
    pub async fn connect(
        &self,
        principal: PrincipalRef,
        address: &str,
        signed_data: &str,
        mode: VerificationMode,
    ) -> Result<WalletLink, WalletError> {
        self.verifier
            .verify_ownership(principal, address, signed_data, mode)
            .await?;

        let label = match self.wallets.find_wallet(address).await? {
            Some(_) => None,
            None => self.resolve_label(address).await,
        };

        let wallet = self.wallets.upsert_wallet(address, principal, label).await?;

        tracing::info!(principal = %principal, address = %address, "Wallet connected");
        self.events.publish(WalletEvent::Connected {
            address: wallet.address.clone(),
            owner: principal,
        });

        Ok(wallet)
    }

    /// Unlink `address` from whoever owns it. Unknown or unowned addresses are a
    /// no-op and publish nothing. Returns whether a link was removed.
    pub async fn disconnect(&self, address: &str) -> Result<bool, WalletError> {
        let cleared = self.wallets.clear_wallet_owner(address).await?;

        if cleared {
            tracing::info!(address = %address, "Wallet disconnected");
            self.events.publish(WalletEvent::Disconnected {
                address: address.to_string(),
            });
        }

        Ok(cleared)
    }

    /// Unlink `address` only if `owner` currently holds it
    pub async fn release(&self, owner: PrincipalRef, address: &str) -> Result<bool, WalletError> {
        let released = self.wallets.release_wallet(address, owner).await?;

        if released {
            tracing::info!(principal = %owner, address = %address, "Wallet disconnected");
            self.events.publish(WalletEvent::Disconnected {
                address: address.to_string(),
            });
        }

        Ok(released)
    }

    /// Wallets currently owned by `owner`
    pub async fn list(&self, owner: PrincipalRef) -> Result<Vec<WalletLink>, WalletError> {
        Ok(self.wallets.wallets_for(owner).await?)
    }

    pub async fn find(&self, address: &str) -> Result<Option<WalletLink>, WalletError> {
        Ok(self.wallets.find_wallet(address).await?)
    }

    pub fn events(&self) -> &WalletEvents {
        &self.events
    }

    async fn resolve_label(&self, address: &str) -> Option<String> {
        match self.labels.resolve(address).await {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Wallet label lookup failed");
                None
            }
        }
    }
}
