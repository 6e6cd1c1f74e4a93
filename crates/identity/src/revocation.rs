//! Logout blacklist for bearer credentials.
//!
//! A structurally valid credential must still be rejected while a revocation
//! entry for it exists. Entries carry a ttl, so the store self-cleans and
//! never grows beyond ttl x revocation rate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::debug;

use crate::IdentityError;

const REVOKED_KEY_PREFIX: &str = "revoked:";

#[derive(Clone)]
enum Backend {
    Redis(ConnectionManager),
    Memory(Arc<Mutex<HashMap<String, Instant>>>),
}

/// Key-value store of invalidated credentials with expiry.
///
/// Backed by Redis when a connection is available, or by an in-process
/// TTL-pruned map otherwise (single-node deployments and tests).
#[derive(Clone)]
pub struct RevocationStore {
    backend: Backend,
}

impl RevocationStore {
    pub fn redis(connection: ConnectionManager) -> Self {
        Self {
            backend: Backend::Redis(connection),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(Mutex::new(HashMap::new()))),
        }
    }

    /// Blacklist a credential for `ttl`.
    pub async fn revoke(&self, credential: &str, ttl: Duration) -> Result<(), IdentityError> {
        match &self.backend {
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                conn.set_ex::<_, _, ()>(revoked_key(credential), "revoked", ttl.as_secs())
                    .await?;
            }
            Backend::Memory(entries) => {
                let mut guard = entries.lock().await;
                prune(&mut guard);
                guard.insert(credential.to_string(), Instant::now() + ttl);
            }
        }
        debug!(ttl_seconds = ttl.as_secs(), "credential revoked");
        Ok(())
    }

    /// Whether a credential is currently blacklisted.
    pub async fn is_revoked(&self, credential: &str) -> Result<bool, IdentityError> {
        match &self.backend {
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                let revoked: bool = conn.exists(revoked_key(credential)).await?;
                Ok(revoked)
            }
            Backend::Memory(entries) => {
                let mut guard = entries.lock().await;
                prune(&mut guard);
                Ok(guard.contains_key(credential))
            }
        }
    }
}

fn revoked_key(credential: &str) -> String {
    format!("{REVOKED_KEY_PREFIX}{credential}")
}

fn prune(entries: &mut HashMap<String, Instant>) {
    let now = Instant::now();
    entries.retain(|_, expires_at| *expires_at > now);
}
