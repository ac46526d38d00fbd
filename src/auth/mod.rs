//! Authentication module for Folio
//!
//! - Wallet ownership challenges backed by a rotating per-principal nonce
//! - Ed25519 proof verification over a detached signature or a signed transaction
//! - Access/refresh JWT issuance, renewal and validation
//! - Password login

mod challenge;
mod crypto;
mod jwt;
mod password;
mod service;

pub use challenge::{challenge_message, ChallengeError, ChallengeStore};
pub use crypto::{
    decode_address, verify_message_signature, verify_transaction_signature, SignatureVerifier,
    VerificationError,
};
pub use jwt::{strip_bearer, Claims, TokenConfig, TokenError, TokenIssuer, TokenPair, BEARER_PREFIX};
pub use service::{AuthError, AuthService, Session};
