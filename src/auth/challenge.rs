//! Wallet challenge issuance
//!
//! A challenge is the deployment-wide sign-message prefix followed by the
//! principal's current nonce. Issuing a new one overwrites the nonce, which
//! silently invalidates every signature made over the previous challenge.

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::PrincipalRef;
use crate::store::{PrincipalStore, StoreError};

#[derive(Error, Debug)]
pub enum ChallengeError {
    #[error("Principal not found")]
    PrincipalNotFound,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// The exact text a wallet has to sign
pub fn challenge_message(prefix: &str, nonce: Uuid) -> String {
    format!("{}{}", prefix, nonce)
}

/// Owns nonce rotation for every principal
#[derive(Clone)]
pub struct ChallengeStore {
    principals: Arc<dyn PrincipalStore>,
    sign_message_prefix: String,
}

impl ChallengeStore {
    pub fn new(principals: Arc<dyn PrincipalStore>, sign_message_prefix: String) -> Self {
        Self {
            principals,
            sign_message_prefix,
        }
    }

    /// Rotate the principal's nonce and return the message to sign
    pub async fn issue_challenge(&self, principal: PrincipalRef) -> Result<String, ChallengeError> {
        let nonce = Uuid::new_v4();

        if !self.principals.rotate_nonce(principal, nonce).await? {
            return Err(ChallengeError::PrincipalNotFound);
        }

        tracing::info!(principal = %principal, "Wallet challenge issued");

        Ok(challenge_message(&self.sign_message_prefix, nonce))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SIGN_MESSAGE_PREFIX;
    use crate::models::{Role, User};
    use crate::store::{MemoryStore, PrincipalStore};
    use chrono::Utc;

    async fn store_with_user(id: i32) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_user(User {
                id,
                email: "reader@example.com".to_string(),
                name: "reader".to_string(),
                role: Role::User,
                password_hash: String::new(),
                nonce: None,
                last_login: None,
                created_at: Utc::now(),
            })
            .await;
        store
    }

    #[test]
    fn test_challenge_message_format() {
        let nonce = Uuid::parse_str("3fa85f64-5717-4562-b3fc-2c963f66afa6").unwrap();
        assert_eq!(
            challenge_message(DEFAULT_SIGN_MESSAGE_PREFIX, nonce),
            "Sign this message for authenticating with your wallet: 3fa85f64-5717-4562-b3fc-2c963f66afa6"
        );
    }

    #[tokio::test]
    async fn test_issue_challenge_persists_nonce() {
        let store = store_with_user(7).await;
        let challenges = ChallengeStore::new(
            Arc::new(store.clone()),
            DEFAULT_SIGN_MESSAGE_PREFIX.to_string(),
        );

        let message = challenges.issue_challenge(PrincipalRef::user(7)).await.unwrap();
        let principal = store
            .find_principal(PrincipalRef::user(7))
            .await
            .unwrap()
            .unwrap();
        let nonce = principal.nonce().unwrap();

        assert_eq!(message, challenge_message(DEFAULT_SIGN_MESSAGE_PREFIX, nonce));
    }

    #[tokio::test]
    async fn test_issue_challenge_rotates() {
        let store = store_with_user(7).await;
        let challenges = ChallengeStore::new(Arc::new(store), "prefix:".to_string());

        let first = challenges.issue_challenge(PrincipalRef::user(7)).await.unwrap();
        let second = challenges.issue_challenge(PrincipalRef::user(7)).await.unwrap();
        assert_ne!(first, second);
        assert!(second.starts_with("prefix:"));
    }

    #[tokio::test]
    async fn test_issue_challenge_unknown_principal() {
        let store = store_with_user(7).await;
        let challenges = ChallengeStore::new(Arc::new(store), "prefix:".to_string());

        let err = challenges
            .issue_challenge(PrincipalRef::creator(7))
            .await
            .unwrap_err();
        assert!(matches!(err, ChallengeError::PrincipalNotFound));
    }
}
