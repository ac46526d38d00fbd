//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthService, ChallengeStore, SignatureVerifier, TokenConfig, TokenIssuer};
use crate::store::{PgStore, PrincipalStore, WalletStore};
use crate::wallet::{LabelResolver, WalletEvents, WalletLinker};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub challenges: Arc<ChallengeStore>,
    pub wallet_linker: Arc<WalletLinker>,
    pub database: Option<Arc<PgStore>>,
}

impl AppState {
    /// Wire the services over the given stores
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        wallets: Arc<dyn WalletStore>,
        labels: Arc<dyn LabelResolver>,
        token_config: TokenConfig,
        sign_message_prefix: String,
    ) -> Self {
        let auth_service = AuthService::new(principals.clone(), TokenIssuer::new(token_config));
        let challenges = ChallengeStore::new(principals.clone(), sign_message_prefix.clone());
        let verifier = SignatureVerifier::new(principals, sign_message_prefix);
        let wallet_linker = WalletLinker::new(verifier, wallets, labels, WalletEvents::default());

        Self {
            auth_service: Arc::new(auth_service),
            challenges: Arc::new(challenges),
            wallet_linker: Arc::new(wallet_linker),
            database: None,
        }
    }

    /// Attach the database the health check pings
    pub fn with_database(mut self, database: Arc<PgStore>) -> Self {
        self.database = Some(database);
        self
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<ChallengeStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.challenges.clone()
    }
}

impl FromRef<AppState> for Arc<WalletLinker> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.wallet_linker.clone()
    }
}
