//! Centralized API error handling for the Folio auth server
//!
//! This module provides a unified error type for API responses with proper
//! HTTP status code mapping and JSON error responses. Domain errors convert
//! into it, and the conversion decides how much detail a client gets to see.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{AuthError, ChallengeError, VerificationError};
use crate::store::StoreError;
use crate::wallet::WalletError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Wallet verification failed")]
    VerificationFailed,

    #[error("Access token expired or invalid, try refreshing it")]
    TokenInvalid,

    #[error("Refresh token expired or invalid, log in again")]
    RefreshInvalid,

    #[error("Principal not found")]
    PrincipalNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::MalformedInput(_) => "MALFORMED_INPUT",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::VerificationFailed => "VERIFICATION_FAILED",
            ApiError::TokenInvalid => "TOKEN_INVALID",
            ApiError::RefreshInvalid => "REFRESH_INVALID",
            ApiError::PrincipalNotFound => "PRINCIPAL_NOT_FOUND",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedInput(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::VerificationFailed
            | ApiError::TokenInvalid
            | ApiError::RefreshInvalid
            | ApiError::PrincipalNotFound
            | ApiError::InvalidCredentials
            | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) | ApiError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn is_server_error(&self) -> bool {
        matches!(self, ApiError::InternalError(_) | ApiError::DatabaseError(_))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Server error details stay in the log
        let message = if self.is_server_error() {
            tracing::error!(error = %self, code = %error_code, "Server error occurred");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, code = %error_code, "Client error occurred");
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        match err {
            e if e.is_malformed() => ApiError::MalformedInput(e.to_string()),
            VerificationError::PrincipalNotFound => ApiError::PrincipalNotFound,
            VerificationError::Storage(e) => ApiError::DatabaseError(e),
            _ => ApiError::VerificationFailed,
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Verification(e) => e.into(),
            WalletError::Storage(e) => e.into(),
        }
    }
}

impl From<ChallengeError> for ApiError {
    fn from(err: ChallengeError) -> Self {
        match err {
            ChallengeError::PrincipalNotFound => ApiError::PrincipalNotFound,
            ChallengeError::Storage(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::AccessExpiredOrInvalid => ApiError::TokenInvalid,
            AuthError::RefreshExpiredOrInvalid => ApiError::RefreshInvalid,
            AuthError::UnknownPrincipalType(_) => {
                ApiError::Forbidden("Unknown principal type".to_string())
            }
            AuthError::PrincipalNotFound => ApiError::PrincipalNotFound,
            AuthError::Storage(e) => e.into(),
            AuthError::Internal(e) => ApiError::InternalError(e),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) | StoreError::Migration(e) => ApiError::DatabaseError(e),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::MalformedInput(err.body_text())
    }
}
