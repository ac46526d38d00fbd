//! Authentication service
//!
//! Password login, access token renewal and access token validation. Every
//! path that mints or accepts a token goes back to the principal store, so
//! role and profile changes are picked up as soon as a token is refreshed or
//! presented.

use std::sync::Arc;
use thiserror::Error;

use crate::models::{Authorization, Principal, PrincipalKind};
use crate::store::{PrincipalStore, StoreError};

use super::jwt::{strip_bearer, Claims, TokenError, TokenIssuer, BEARER_PREFIX};
use super::password::verify_password;

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access token expired or invalid")]
    AccessExpiredOrInvalid,

    #[error("Refresh token expired or invalid")]
    RefreshExpiredOrInvalid,

    #[error("Unknown principal type: {0}")]
    UnknownPrincipalType(String),

    #[error("Principal not found")]
    PrincipalNotFound,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A validated access token together with the principal it names
#[derive(Debug, Clone)]
pub struct Session {
    pub principal: Principal,
    pub claims: Claims,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    principals: Arc<dyn PrincipalStore>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(principals: Arc<dyn PrincipalStore>, tokens: TokenIssuer) -> Self {
        Self { principals, tokens }
    }

    /// Check a password and open a session
    pub async fn login(
        &self,
        kind: PrincipalKind,
        name_or_email: &str,
        password: &str,
    ) -> Result<Authorization, AuthError> {
        let principal = self
            .principals
            .find_by_login(kind, name_or_email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = principal.password_hash().to_string();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        match verified {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::InvalidCredentials),
            Err(e) => {
                tracing::warn!(principal = %principal.reference(), error = %e, "Stored password hash unreadable");
                return Err(AuthError::InvalidCredentials);
            }
        }

        self.principals
            .touch_last_login(principal.reference())
            .await?;

        tracing::info!(principal = %principal.reference(), "Principal logged in");

        self.authorize(&principal)
    }

    /// Mint a `Bearer `-prefixed token pair for an already resolved principal
    pub fn authorize(&self, principal: &Principal) -> Result<Authorization, AuthError> {
        let pair = self.tokens.issue(principal)?;
        Ok(Authorization {
            access_token: format!("{}{}", BEARER_PREFIX, pair.access_token),
            refresh_token: format!("{}{}", BEARER_PREFIX, pair.refresh_token),
        })
    }

    /// Exchange a refresh token for a new bare access token.
    ///
    /// The refresh token itself is not rotated and stays valid until it expires.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        self.refresh_inner(refresh_token, None).await
    }

    /// Like [`refresh`](Self::refresh), but only for a token of the given kind
    pub async fn refresh_as(
        &self,
        kind: PrincipalKind,
        refresh_token: &str,
    ) -> Result<String, AuthError> {
        self.refresh_inner(refresh_token, Some(kind)).await
    }

    async fn refresh_inner(
        &self,
        refresh_token: &str,
        expected: Option<PrincipalKind>,
    ) -> Result<String, AuthError> {
        let claims = self
            .tokens
            .decode_refresh(strip_bearer(refresh_token))
            .map_err(|e| match e {
                TokenError::UnknownPrincipalType(kind) => AuthError::UnknownPrincipalType(kind),
                _ => AuthError::RefreshExpiredOrInvalid,
            })?;

        if expected.is_some_and(|kind| kind != claims.kind) {
            return Err(AuthError::RefreshExpiredOrInvalid);
        }

        let principal = self
            .principals
            .find_principal(claims.principal_ref())
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        self.principals
            .touch_last_login(principal.reference())
            .await?;

        tracing::info!(principal = %principal.reference(), "Access token refreshed");

        Ok(self.tokens.issue_access(&principal)?)
    }

    /// Validate an access token and load the principal it names
    pub async fn validate(&self, access_token: &str) -> Result<Session, AuthError> {
        let claims = self
            .tokens
            .decode_access(strip_bearer(access_token))
            .map_err(|e| match e {
                TokenError::UnknownPrincipalType(kind) => AuthError::UnknownPrincipalType(kind),
                _ => AuthError::AccessExpiredOrInvalid,
            })?;

        let principal = self
            .principals
            .find_principal(claims.principal_ref())
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        Ok(Session {
            claims: Claims::from_principal(&principal),
            principal,
        })
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::UnknownPrincipalType(kind) => AuthError::UnknownPrincipalType(kind),
            other => AuthError::Internal(other.to_string()),
        }
    }
}
