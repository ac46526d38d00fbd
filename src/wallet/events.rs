//! Wallet link notifications

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::PrincipalRef;

/// Published after a wallet link changes
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletEvent {
    Connected {
        address: String,
        owner: PrincipalRef,
    },
    Disconnected {
        address: String,
    },
}

/// Fire-and-forget fan-out of wallet events
#[derive(Clone)]
pub struct WalletEvents {
    tx: broadcast::Sender<WalletEvent>,
}

impl WalletEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.tx.subscribe()
    }

    /// Never fails; an event nobody listens to is dropped
    pub fn publish(&self, event: WalletEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No wallet event subscribers");
        }
    }
}

impl Default for WalletEvents {
    fn default() -> Self {
        Self::new(100)
    }
}
