//! Middleware for the Folio auth API
//!
//! Request tracing and the authentication extractors.

pub mod auth;
mod tracing;

pub use auth::{AdminPrincipal, AuthenticatedPrincipal};
pub use tracing::{request_tracing, REQUEST_ID_HEADER};
