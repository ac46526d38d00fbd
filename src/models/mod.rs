//! Data models for the Folio auth server

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// The two kinds of principal that can hold a session
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "principal_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Creator,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Creator => "creator",
        }
    }

    /// Parse the wire discriminant. Anything other than the two known kinds is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(PrincipalKind::User),
            "creator" => Some(PrincipalKind::Creator),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity key of a principal: ids are only unique within a kind
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrincipalRef {
    pub kind: PrincipalKind,
    pub id: i32,
}

impl PrincipalRef {
    pub fn user(id: i32) -> Self {
        Self {
            kind: PrincipalKind::User,
            id,
        }
    }

    pub fn creator(id: i32) -> Self {
        Self {
            kind: PrincipalKind::Creator,
            id,
        }
    }
}

impl std::fmt::Display for PrincipalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Tester,
    User,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

/// User model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub nonce: Option<Uuid>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Creator account model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Creator {
    pub id: i32,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub nonce: Option<Uuid>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A resolved principal record of either kind
#[derive(Debug, Clone)]
pub enum Principal {
    User(User),
    Creator(Creator),
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::User(_) => PrincipalKind::User,
            Principal::Creator(_) => PrincipalKind::Creator,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Principal::User(u) => u.id,
            Principal::Creator(c) => c.id,
        }
    }

    pub fn reference(&self) -> PrincipalRef {
        PrincipalRef {
            kind: self.kind(),
            id: self.id(),
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Principal::User(u) => &u.email,
            Principal::Creator(c) => &c.email,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Principal::User(u) => &u.name,
            Principal::Creator(c) => &c.name,
        }
    }

    /// Creators carry no role
    pub fn role(&self) -> Option<Role> {
        match self {
            Principal::User(u) => Some(u.role),
            Principal::Creator(_) => None,
        }
    }

    pub fn nonce(&self) -> Option<Uuid> {
        match self {
            Principal::User(u) => u.nonce,
            Principal::Creator(c) => c.nonce,
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            Principal::User(u) => &u.password_hash,
            Principal::Creator(c) => &c.password_hash,
        }
    }
}

/// Wallet address record. Rows outlive their owner: disconnecting clears the owner only.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WalletLink {
    pub address: String,
    pub owner: Option<PrincipalRef>,
    pub label: Option<String>,
    pub connected_at: DateTime<Utc>,
}
