//! API handlers for the Folio auth server

pub mod auth;
pub mod health;
pub mod wallet;

pub use auth::*;
pub use health::health_check;
pub use wallet::*;

// Re-export the extractors for handler use
pub use crate::middleware::auth::{AdminPrincipal, AuthenticatedPrincipal};
