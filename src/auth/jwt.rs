//! JWT token generation and validation
//!
//! Handles creation and verification of access and refresh tokens. The two
//! token kinds are signed with independent secrets, so neither can stand in
//! for the other.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Principal, PrincipalKind, PrincipalRef, Role};

pub const BEARER_PREFIX: &str = "Bearer ";

/// JWT-related errors
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Unknown principal type: {0}")]
    UnknownPrincipalType(String),
}

/// Signing secrets and lifetimes, injected at construction
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// The sanitized claim set. Nothing else about a principal ever reaches a token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    #[serde(rename = "type")]
    pub kind: PrincipalKind,
    pub id: i32,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl Claims {
    pub fn from_principal(principal: &Principal) -> Self {
        Self {
            kind: principal.kind(),
            id: principal.id(),
            email: principal.email().to_string(),
            name: principal.name().to_string(),
            role: principal.role(),
        }
    }

    pub fn principal_ref(&self) -> PrincipalRef {
        PrincipalRef {
            kind: self.kind,
            id: self.id,
        }
    }
}

/// Wire payload as signed
#[derive(Serialize)]
struct SignedClaims<'a> {
    #[serde(flatten)]
    claims: &'a Claims,
    iat: i64,
    exp: i64,
}

/// Wire payload as decoded; the discriminant is checked by hand
#[derive(Deserialize)]
struct RawClaims {
    #[serde(rename = "type")]
    kind: String,
    id: i32,
    email: String,
    name: String,
    #[serde(default)]
    role: Option<Role>,
}

impl TryFrom<RawClaims> for Claims {
    type Error = TokenError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let kind = PrincipalKind::parse(&raw.kind)
            .ok_or_else(|| TokenError::UnknownPrincipalType(raw.kind.clone()))?;
        Ok(Claims {
            kind,
            id: raw.id,
            email: raw.email,
            name: raw.name,
            role: raw.role,
        })
    }
}

/// Freshly minted session tokens, without transport prefix
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Strip an optional `Bearer ` prefix
pub fn strip_bearer(token: &str) -> &str {
    let token = token.trim();
    token.strip_prefix(BEARER_PREFIX).unwrap_or(token).trim()
}

/// Mints and checks access and refresh tokens
#[derive(Clone)]
pub struct TokenIssuer {
    access_ttl: Duration,
    refresh_ttl: Duration,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenIssuer {
    pub fn new(config: TokenConfig) -> Self {
        Self {
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
        }
    }

    /// Issue an access/refresh pair from a principal record
    pub fn issue(&self, principal: &Principal) -> Result<TokenPair, TokenError> {
        let claims = Claims::from_principal(principal);
        Ok(TokenPair {
            access_token: sign(&claims, &self.access_encoding, self.access_ttl)?,
            refresh_token: sign(&claims, &self.refresh_encoding, self.refresh_ttl)?,
        })
    }

    /// Issue an access token only
    pub fn issue_access(&self, principal: &Principal) -> Result<String, TokenError> {
        let claims = Claims::from_principal(principal);
        sign(&claims, &self.access_encoding, self.access_ttl)
    }

    pub fn decode_access(&self, token: &str) -> Result<Claims, TokenError> {
        verify(token, &self.access_decoding)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        verify(token, &self.refresh_decoding)
    }

}

fn sign(claims: &Claims, key: &EncodingKey, ttl: Duration) -> Result<String, TokenError> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(ttl)
        .ok_or_else(|| TokenError::EncodingFailed("token lifetime out of range".to_string()))?;
    let payload = SignedClaims {
        claims,
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(&Header::new(Algorithm::HS256), &payload, key)
        .map_err(|e| TokenError::EncodingFailed(e.to_string()))
}

fn verify(token: &str, key: &DecodingKey) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<RawClaims>(token, key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(e.to_string()),
    })?;

    token_data.claims.try_into()
}
