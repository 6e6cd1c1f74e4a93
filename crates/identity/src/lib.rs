//! Credential handling for the Huddle backend: issuing and verifying bearer
//! credentials, and the logout revocation blacklist.

pub mod revocation;
pub mod token;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use revocation::RevocationStore;
pub use token::{IssuedCredential, TokenAuthority};

/// A verified user identity, extracted from a credential exactly once at
/// admission time and treated as immutable from then on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable public identifier of the user.
    pub id: String,
    pub email: String,
    /// Expiry of the credential this identity was derived from.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("credential creation failed: {0}")]
    TokenCreation(String),

    #[error("revocation backend error: {0}")]
    RevocationBackend(#[from] redis::RedisError),
}
