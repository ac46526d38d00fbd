//! In-process store used by tests and local experiments

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PrincipalStore, StoreError, WalletStore};
use crate::models::{Creator, Principal, PrincipalKind, PrincipalRef, Role, User, WalletLink};

#[derive(Default)]
struct Tables {
    users: HashMap<i32, User>,
    creators: HashMap<i32, Creator>,
    wallets: HashMap<String, WalletLink>,
}

/// Store backed by maps behind a single lock
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }

    pub async fn insert_creator(&self, creator: Creator) {
        self.tables.write().await.creators.insert(creator.id, creator);
    }

    pub async fn remove_principal(&self, principal: PrincipalRef) {
        let mut tables = self.tables.write().await;
        match principal.kind {
            PrincipalKind::User => {
                tables.users.remove(&principal.id);
            }
            PrincipalKind::Creator => {
                tables.creators.remove(&principal.id);
            }
        }
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn find_principal(&self, principal: PrincipalRef) -> Result<Option<Principal>, StoreError> {
        let tables = self.tables.read().await;
        Ok(match principal.kind {
            PrincipalKind::User => tables.users.get(&principal.id).cloned().map(Principal::User),
            PrincipalKind::Creator => tables
                .creators
                .get(&principal.id)
                .cloned()
                .map(Principal::Creator),
        })
    }

    async fn find_by_login(
        &self,
        kind: PrincipalKind,
        name_or_email: &str,
    ) -> Result<Option<Principal>, StoreError> {
        let tables = self.tables.read().await;
        // Email matches rank ahead of name matches, then lowest id
        let rank = |id: i32, name: &str, email: &str| {
            if email.eq_ignore_ascii_case(name_or_email) {
                Some((0, id))
            } else if name.eq_ignore_ascii_case(name_or_email) {
                Some((1, id))
            } else {
                None
            }
        };
        Ok(match kind {
            PrincipalKind::User => tables
                .users
                .values()
                .filter_map(|u| rank(u.id, &u.name, &u.email).map(|r| (r, u)))
                .min_by_key(|(r, _)| *r)
                .map(|(_, u)| Principal::User(u.clone())),
            PrincipalKind::Creator => tables
                .creators
                .values()
                .filter_map(|c| rank(c.id, &c.name, &c.email).map(|r| (r, c)))
                .min_by_key(|(r, _)| *r)
                .map(|(_, c)| Principal::Creator(c.clone())),
        })
    }

    async fn rotate_nonce(&self, principal: PrincipalRef, nonce: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let slot = match principal.kind {
            PrincipalKind::User => tables.users.get_mut(&principal.id).map(|u| &mut u.nonce),
            PrincipalKind::Creator => tables.creators.get_mut(&principal.id).map(|c| &mut c.nonce),
        };
        match slot {
            Some(current) => {
                *current = Some(nonce);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_last_login(&self, principal: PrincipalRef) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        match principal.kind {
            PrincipalKind::User => {
                if let Some(u) = tables.users.get_mut(&principal.id) {
                    u.last_login = Some(now);
                }
            }
            PrincipalKind::Creator => {
                if let Some(c) = tables.creators.get_mut(&principal.id) {
                    c.last_login = Some(now);
                }
            }
        }
        Ok(())
    }

    async fn update_role(&self, user_id: i32, role: Role) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn find_wallet(&self, address: &str) -> Result<Option<WalletLink>, StoreError> {
        Ok(self.tables.read().await.wallets.get(address).cloned())
    }

    async fn upsert_wallet(
        &self,
        address: &str,
        owner: PrincipalRef,
        label: Option<String>,
    ) -> Result<WalletLink, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let wallet = tables
            .wallets
            .entry(address.to_string())
            .or_insert_with(|| WalletLink {
                address: address.to_string(),
                owner: None,
                label: None,
                connected_at: now,
            });
        wallet.owner = Some(owner);
        wallet.connected_at = now;
        if wallet.label.is_none() {
            wallet.label = label;
        }
        Ok(wallet.clone())
    }

    async fn clear_wallet_owner(&self, address: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .wallets
            .get_mut(address)
            .and_then(|wallet| wallet.owner.take())
            .is_some())
    }

    async fn release_wallet(&self, address: &str, owner: PrincipalRef) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.wallets.get_mut(address) {
            Some(wallet) if wallet.owner == Some(owner) => {
                wallet.owner = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn wallets_for(&self, owner: PrincipalRef) -> Result<Vec<WalletLink>, StoreError> {
        let tables = self.tables.read().await;
        let mut wallets: Vec<WalletLink> = tables
            .wallets
            .values()
            .filter(|w| w.owner == Some(owner))
            .cloned()
            .collect();
        wallets.sort_by(|a, b| a.connected_at.cmp(&b.connected_at));
        Ok(wallets)
    }
}
