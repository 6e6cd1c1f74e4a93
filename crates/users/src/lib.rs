//! User accounts: registration, login, and profile lookup. Issued bearer
//! credentials come from [`huddle_identity::TokenAuthority`]; the directory
//! itself never stores tokens.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use cuid2::CuidConstructor;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::info;

use huddle_identity::{IdentityError, IssuedCredential, TokenAuthority};

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user already exists")]
    UserExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password too weak")]
    PasswordTooWeak,
    #[error("user not found")]
    UserNotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("credential error: {0}")]
    Credential(#[from] IdentityError),
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub email: String,
}

/// User account service over the shared database pool.
#[derive(Clone)]
pub struct UserDirectory {
    pool: SqlitePool,
    tokens: TokenAuthority,
}

impl UserDirectory {
    pub fn new(pool: SqlitePool, tokens: TokenAuthority) -> Self {
        Self { pool, tokens }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Register a new account and issue its first credential.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, IssuedCredential), UserError> {
        let email = normalize_email(email)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(UserError::PasswordTooWeak);
        }

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(UserError::UserExists);
        }

        let now = Utc::now().to_rfc3339();
        let public_id = CUID.create_id();
        let password_hash = self.hash_password(password)?;

        let result = sqlx::query(
            "INSERT INTO users (public_id, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&email)
        .bind(&password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let user = User {
            id: result.last_insert_rowid(),
            public_id,
            email,
        };

        info!(user = %user.public_id, "registered new user");

        let credential = self.tokens.issue(&user.public_id, &user.email)?;
        Ok((user, credential))
    }

    /// Authenticate with email and password; issues a fresh credential.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, IssuedCredential), UserError> {
        let email = email.trim().to_lowercase();

        let row = sqlx::query("SELECT id, public_id, email, password_hash FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(UserError::InvalidCredentials);
        };

        let stored: String = row.try_get("password_hash")?;
        let parsed = PasswordHash::new(&stored)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| UserError::InvalidCredentials)?;

        let user = User {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            email: row.try_get("email")?,
        };

        let credential = self.tokens.issue(&user.public_id, &user.email)?;
        Ok((user, credential))
    }

    /// Look up a user by public identifier.
    pub async fn profile(&self, public_id: &str) -> Result<User, UserError> {
        let row = sqlx::query("SELECT id, public_id, email FROM users WHERE public_id = ?")
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(UserError::UserNotFound);
        };

        Ok(User {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            email: row.try_get("email")?,
        })
    }

    /// Every registered user except the caller, for collaborator pickers.
    pub async fn list_others(&self, public_id: &str) -> Result<Vec<User>, UserError> {
        let rows = sqlx::query("SELECT id, public_id, email FROM users WHERE public_id != ? ORDER BY email")
            .bind(public_id)
            .fetch_all(&self.pool)
            .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(User {
                id: row.try_get("id")?,
                public_id: row.try_get("public_id")?,
                email: row.try_get("email")?,
            });
        }
        Ok(users)
    }

    fn hash_password(&self, password: &str) -> Result<String, UserError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }
}

fn normalize_email(email: &str) -> Result<String, UserError> {
    let email = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(UserError::InvalidEmail);
    }
    Ok(email)
}
