//! JWT issuing and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use huddle_config::AuthConfig;

use crate::{Identity, IdentityError};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,   // Subject (user public id)
    pub email: String, // Subject email
    pub exp: usize,    // Expiration time
    pub iat: usize,    // Issued at
    pub iss: String,   // Issuer
    pub aud: String,   // Audience
    pub jti: String,   // JWT ID
}

/// A freshly issued credential together with its expiry.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies bearer credentials with a shared HS256 secret.
#[derive(Clone)]
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    token_ttl: Duration,
}

impl TokenAuthority {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_ref()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_ref()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            token_ttl: Duration::seconds(config.token_ttl_seconds.min(i64::MAX as u64) as i64),
        }
    }

    /// Override the credential lifetime.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Issue a new credential for a user.
    pub fn issue(&self, subject: &str, email: &str) -> Result<IssuedCredential, IdentityError> {
        let now = Utc::now();
        let expires_at = now + self.token_ttl;

        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            exp: expires_at.timestamp().max(0) as usize,
            iat: now.timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| IdentityError::TokenCreation(err.to_string()))?;

        Ok(IssuedCredential { token, expires_at })
    }

    /// Verify a credential and extract the identity it carries.
    ///
    /// Structural validity, signature, expiry, issuer and audience are all
    /// checked; any failure yields `InvalidCredential`. A credential is never
    /// partially trusted.
    pub fn verify(&self, token: &str) -> Result<Identity, IdentityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|err| IdentityError::InvalidCredential(err.to_string()))?;

        let claims = token_data.claims;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp as i64, 0)
            .ok_or_else(|| IdentityError::InvalidCredential("expiry out of range".to_string()))?;

        Ok(Identity {
            id: claims.sub,
            email: claims.email,
            expires_at,
        })
    }
}
