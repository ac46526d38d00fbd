//! PostgreSQL store, including pool setup and embedded migrations

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use super::{PrincipalStore, StoreError, WalletStore};
use crate::config::Config;
use crate::models::{Creator, Principal, PrincipalKind, PrincipalRef, Role, User, WalletLink};

const SELECT_USER_BY_ID: &str = r#"
    SELECT id, email, name, role, password_hash, nonce, last_login, created_at
    FROM users
    WHERE id = $1
"#;

const SELECT_USER_BY_LOGIN: &str = r#"
    SELECT id, email, name, role, password_hash, nonce, last_login, created_at
    FROM users
    WHERE lower(name) = lower($1) OR lower(email) = lower($1)
    ORDER BY lower(email) = lower($1) DESC, id ASC
    LIMIT 1
"#;

const SELECT_CREATOR_BY_ID: &str = r#"
    SELECT id, email, name, password_hash, nonce, last_login, created_at
    FROM creators
    WHERE id = $1
"#;

const SELECT_CREATOR_BY_LOGIN: &str = r#"
    SELECT id, email, name, password_hash, nonce, last_login, created_at
    FROM creators
    WHERE lower(name) = lower($1) OR lower(email) = lower($1)
    ORDER BY lower(email) = lower($1) DESC, id ASC
    LIMIT 1
"#;

/// Raw wallet row; the owner pair is nullable as a unit
#[derive(sqlx::FromRow)]
struct WalletRow {
    address: String,
    owner_kind: Option<PrincipalKind>,
    owner_id: Option<i32>,
    label: Option<String>,
    connected_at: DateTime<Utc>,
}

impl From<WalletRow> for WalletLink {
    fn from(row: WalletRow) -> Self {
        let owner = match (row.owner_kind, row.owner_id) {
            (Some(kind), Some(id)) => Some(PrincipalRef { kind, id }),
            _ => None,
        };
        Self {
            address: row.address,
            owner,
            label: row.label,
            connected_at: row.connected_at,
        }
    }
}

/// Store backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    db_pool: PgPool,
}

impl PgStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Open a pool sized from configuration
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        tracing::info!(url = %config.database_url_masked(), "Connecting to database");

        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(&config.database_url)
            .await?;

        tracing::info!("Database connection pool created");
        Ok(Self::new(db_pool))
    }

    /// Apply the embedded migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Round-trip a trivial query
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }
}

#[async_trait]
impl PrincipalStore for PgStore {
    async fn find_principal(&self, principal: PrincipalRef) -> Result<Option<Principal>, StoreError> {
        let found = match principal.kind {
            PrincipalKind::User => sqlx::query_as::<_, User>(SELECT_USER_BY_ID)
                .bind(principal.id)
                .fetch_optional(&self.db_pool)
                .await?
                .map(Principal::User),
            PrincipalKind::Creator => sqlx::query_as::<_, Creator>(SELECT_CREATOR_BY_ID)
                .bind(principal.id)
                .fetch_optional(&self.db_pool)
                .await?
                .map(Principal::Creator),
        };
        Ok(found)
    }

    async fn find_by_login(
        &self,
        kind: PrincipalKind,
        name_or_email: &str,
    ) -> Result<Option<Principal>, StoreError> {
        let found = match kind {
            PrincipalKind::User => sqlx::query_as::<_, User>(SELECT_USER_BY_LOGIN)
                .bind(name_or_email)
                .fetch_optional(&self.db_pool)
                .await?
                .map(Principal::User),
            PrincipalKind::Creator => sqlx::query_as::<_, Creator>(SELECT_CREATOR_BY_LOGIN)
                .bind(name_or_email)
                .fetch_optional(&self.db_pool)
                .await?
                .map(Principal::Creator),
        };
        Ok(found)
    }

    async fn rotate_nonce(&self, principal: PrincipalRef, nonce: Uuid) -> Result<bool, StoreError> {
        let sql = match principal.kind {
            PrincipalKind::User => "UPDATE users SET nonce = $1 WHERE id = $2",
            PrincipalKind::Creator => "UPDATE creators SET nonce = $1 WHERE id = $2",
        };
        let rows_affected = sqlx::query(sql)
            .bind(nonce)
            .bind(principal.id)
            .execute(&self.db_pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn touch_last_login(&self, principal: PrincipalRef) -> Result<(), StoreError> {
        let sql = match principal.kind {
            PrincipalKind::User => "UPDATE users SET last_login = NOW() WHERE id = $1",
            PrincipalKind::Creator => "UPDATE creators SET last_login = NOW() WHERE id = $1",
        };
        sqlx::query(sql)
            .bind(principal.id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    async fn update_role(&self, user_id: i32, role: Role) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role)
            .bind(user_id)
            .execute(&self.db_pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}

#[async_trait]
impl WalletStore for PgStore {
    async fn find_wallet(&self, address: &str) -> Result<Option<WalletLink>, StoreError> {
        let row: Option<WalletRow> = sqlx::query_as(
            r#"
            SELECT address, owner_kind, owner_id, label, connected_at
            FROM wallets
            WHERE address = $1
            "#,
        )
        .bind(address)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn upsert_wallet(
        &self,
        address: &str,
        owner: PrincipalRef,
        label: Option<String>,
    ) -> Result<WalletLink, StoreError> {
        let row: WalletRow = sqlx::query_as(
            r#"
            INSERT INTO wallets (address, owner_kind, owner_id, label, connected_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (address) DO UPDATE
            SET owner_kind = EXCLUDED.owner_kind,
                owner_id = EXCLUDED.owner_id,
                label = COALESCE(wallets.label, EXCLUDED.label),
                connected_at = EXCLUDED.connected_at
            RETURNING address, owner_kind, owner_id, label, connected_at
            "#,
        )
        .bind(address)
        .bind(owner.kind)
        .bind(owner.id)
        .bind(&label)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(row.into())
    }

    async fn clear_wallet_owner(&self, address: &str) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE wallets
            SET owner_kind = NULL, owner_id = NULL
            WHERE address = $1 AND owner_id IS NOT NULL
            "#,
        )
        .bind(address)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn release_wallet(&self, address: &str, owner: PrincipalRef) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE wallets
            SET owner_kind = NULL, owner_id = NULL
            WHERE address = $1 AND owner_kind = $2 AND owner_id = $3
            "#,
        )
        .bind(address)
        .bind(owner.kind)
        .bind(owner.id)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn wallets_for(&self, owner: PrincipalRef) -> Result<Vec<WalletLink>, StoreError> {
        let rows: Vec<WalletRow> = sqlx::query_as(
            r#"
            SELECT address, owner_kind, owner_id, label, connected_at
            FROM wallets
            WHERE owner_kind = $1 AND owner_id = $2
            ORDER BY connected_at ASC
            "#,
        )
        .bind(owner.kind)
        .bind(owner.id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
