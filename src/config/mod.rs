//! Configuration management for the Folio auth server
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).
//! Services never read the environment themselves; they receive the pieces they
//! need from [`Config`] at construction.

use chrono::Duration;
use std::env;
use thiserror::Error;

use crate::auth::TokenConfig;

/// Default text every wallet challenge starts with
pub const DEFAULT_SIGN_MESSAGE_PREFIX: &str =
    "Sign this message for authenticating with your wallet: ";

/// Upper bound on either token lifetime
pub const MAX_TOKEN_TTL_DAYS: i64 = 36_500;

const DEV_ACCESS_SECRET: &str = "development-access-secret-change-in-production";
const DEV_REFRESH_SECRET: &str = "development-refresh-secret-change-in-production";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// CORS allowed origins, comma separated
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// Fixed text prepended to every challenge nonce
    pub sign_message_prefix: String,

    /// Secret for access tokens
    pub jwt_access_secret: String,

    /// Secret for refresh tokens; must differ from the access secret
    pub jwt_refresh_secret: String,

    /// Access token lifetime in days (default: 30)
    pub jwt_access_ttl_days: i64,

    /// Refresh token lifetime in days (default: 90)
    pub jwt_refresh_ttl_days: i64,

    /// Base URL of the wallet naming service; unset disables label lookups
    pub name_service_url: Option<String>,

    /// Upper bound on a single label lookup
    pub name_service_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let port = var("PORT")
            .unwrap_or_else(|| "3005".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let db_max_connections = var("DB_MAX_CONNECTIONS")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(5);

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS").filter(|s| !s.is_empty());

        let log_level = var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let sign_message_prefix =
            var("SIGN_MESSAGE_PREFIX").unwrap_or_else(|| DEFAULT_SIGN_MESSAGE_PREFIX.to_string());

        let jwt_access_secret = secret(&var, "JWT_ACCESS_SECRET", DEV_ACCESS_SECRET, environment)?;
        let jwt_refresh_secret =
            secret(&var, "JWT_REFRESH_SECRET", DEV_REFRESH_SECRET, environment)?;

        if jwt_access_secret == jwt_refresh_secret {
            return Err(ConfigError::InvalidValue(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ".to_string(),
            ));
        }

        let jwt_access_ttl_days = positive_days(&var, "JWT_ACCESS_TTL_DAYS", 30)?;
        let jwt_refresh_ttl_days = positive_days(&var, "JWT_REFRESH_TTL_DAYS", 90)?;

        let name_service_url = var("NAME_SERVICE_URL")
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string());

        let name_service_timeout_ms = var("NAME_SERVICE_TIMEOUT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1500);

        Ok(Config {
            database_url,
            environment,
            port,
            db_max_connections,
            cors_allowed_origins,
            log_level,
            sign_message_prefix,
            jwt_access_secret,
            jwt_refresh_secret,
            jwt_access_ttl_days,
            jwt_refresh_ttl_days,
            name_service_url,
            name_service_timeout_ms,
        })
    }

    /// Signing material for the token issuer
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            access_secret: self.jwt_access_secret.clone(),
            refresh_secret: self.jwt_refresh_secret.clone(),
            access_ttl: Duration::days(self.jwt_access_ttl_days),
            refresh_ttl: Duration::days(self.jwt_refresh_ttl_days),
        }
    }

    /// Get database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> String {
        if let Some(at_pos) = self.database_url.find('@') {
            if let Some(colon_pos) = self.database_url[..at_pos].rfind(':') {
                let prefix = &self.database_url[..colon_pos + 1];
                let suffix = &self.database_url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        self.database_url.clone()
    }
}

/// Secrets fall back to development values everywhere except production
fn secret<F>(
    var: &F,
    key: &str,
    dev_default: &str,
    environment: Environment,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key).filter(|s| !s.is_empty()) {
        Some(value) => Ok(value),
        None if environment.is_production() => Err(ConfigError::MissingEnvVar(key.to_string())),
        None => {
            tracing::warn!(key, "Signing secret not set, using development default");
            Ok(dev_default.to_string())
        }
    }
}

fn positive_days<F>(var: &F, key: &str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(key) else {
        return Ok(default);
    };
    match raw.parse::<i64>() {
        Ok(days) if (1..=MAX_TOKEN_TTL_DAYS).contains(&days) => Ok(days),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} must be between 1 and {} days, got '{}'",
            key, MAX_TOKEN_TTL_DAYS, raw
        ))),
    }
}
