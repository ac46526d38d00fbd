//! Folio auth server library
//!
//! Wallet ownership challenges and session tokens for users and creators,
//! plus the axum surface that exposes them.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod store;
pub mod wallet;
