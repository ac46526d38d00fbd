//! Authentication extractors
//!
//! Verify the bearer access token and load the principal it names.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::{AuthService, Claims};
use crate::error::ApiError;
use crate::models::{Principal, PrincipalRef};

/// Principal behind a valid access token, loaded fresh from the store
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub principal: Principal,
    pub claims: Claims,
}

impl AuthenticatedPrincipal {
    pub fn reference(&self) -> PrincipalRef {
        self.principal.reference()
    }
}

/// Extractor for authenticated principals
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(auth: AuthenticatedPrincipal) -> impl IntoResponse {
///     format!("Hello, {}", auth.reference())
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);
        let session = auth_service.validate(bearer.token()).await?;

        Ok(AuthenticatedPrincipal {
            principal: session.principal,
            claims: session.claims,
        })
    }
}

/// Requires a user holding the admin or superadmin role
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub AuthenticatedPrincipal);

#[async_trait]
impl<S> FromRequestParts<S> for AdminPrincipal
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthenticatedPrincipal::from_request_parts(parts, state).await?;

        let is_admin = auth.principal.role().is_some_and(|role| role.is_admin());
        if !is_admin {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminPrincipal(auth))
    }
}
