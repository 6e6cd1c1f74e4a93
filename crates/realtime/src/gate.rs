//! Per-connection admission handshake.
//!
//! A connection starts `Pending`, and either passes every check and becomes
//! `Admitted` (registering its identity in the room registry) or is
//! `Rejected` with a distinct reason. Admitted connections end `Closed`,
//! which releases their room seat. Rejected and Closed are terminal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use huddle_identity::{Identity, RevocationStore, TokenAuthority};

use crate::events::{ConnectionId, RoomEvent, ServerEvent};
use crate::registry::RoomRegistry;

/// Metadata of a resolved room, as reported by the storage collaborator.
#[derive(Debug, Clone)]
pub struct RoomMetadata {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("room not found")]
    NotFound,
    #[error("room lookup failed: {0}")]
    Backend(String),
}

/// Boundary to persistent project storage: room resolution once per
/// handshake, and the persisted-membership append for first-time joiners.
#[async_trait]
pub trait RoomResolver: Send + Sync {
    async fn resolve_room(&self, room_id: &str) -> Result<RoomMetadata, ResolveError>;
    async fn append_member(&self, room_id: &str, identity: &Identity) -> Result<(), ResolveError>;
}

/// Handshake rejection reasons. Each is terminal for the connection attempt
/// and surfaced to the caller before teardown, so clients can tell "retry
/// with a new credential" apart from "room does not exist".
#[derive(Debug, Error)]
pub enum GateError {
    #[error("missing target room")]
    MissingRoom,
    #[error("room not found")]
    RoomNotFound,
    #[error("missing credential")]
    MissingCredential,
    #[error("credential revoked")]
    RevokedCredential,
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("room lookup failed: {0}")]
    Lookup(String),
    #[error("revocation check failed: {0}")]
    Revocation(String),
}

/// Connection lifecycle. `Pending` and `Rejected` exist only inside the
/// handshake; an [`AdmittedConnection`] is observably `Admitted` until it is
/// closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Pending,
    Admitted,
    Rejected,
    Closed,
}

/// Raw handshake material extracted from the transport.
#[derive(Debug, Default)]
pub struct HandshakeRequest {
    pub credential: Option<String>,
    pub room_id: Option<String>,
}

/// A connection that passed the handshake. Owns exactly one room membership
/// for its lifetime; the seat is released by [`ConnectionGate::close`].
pub struct AdmittedConnection {
    id: ConnectionId,
    identity: Identity,
    room_id: String,
    closed: AtomicBool,
}

impl AdmittedConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The verified identity, produced once at admission and never
    /// re-derived from client-supplied fields.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn phase(&self) -> ConnectionPhase {
        if self.closed.load(Ordering::SeqCst) {
            ConnectionPhase::Closed
        } else {
            ConnectionPhase::Admitted
        }
    }
}

/// Runs the admission handshake and the close transition.
pub struct ConnectionGate {
    registry: Arc<RoomRegistry>,
    verifier: TokenAuthority,
    revocations: RevocationStore,
    resolver: Arc<dyn RoomResolver>,
}

impl ConnectionGate {
    pub fn new(
        registry: Arc<RoomRegistry>,
        verifier: TokenAuthority,
        revocations: RevocationStore,
        resolver: Arc<dyn RoomResolver>,
    ) -> Self {
        Self {
            registry,
            verifier,
            revocations,
            resolver,
        }
    }

    /// Run the handshake: resolve the target room, verify the credential
    /// against the revocation store and the token authority, then register
    /// the identity in the room and notify the roster.
    pub async fn admit(
        &self,
        request: HandshakeRequest,
    ) -> Result<(AdmittedConnection, broadcast::Receiver<RoomEvent>), GateError> {
        let room_id = request
            .room_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(GateError::MissingRoom)?;

        let room = self
            .resolver
            .resolve_room(&room_id)
            .await
            .map_err(|err| match err {
                ResolveError::NotFound => GateError::RoomNotFound,
                ResolveError::Backend(message) => GateError::Lookup(message),
            })?;

        let credential = request
            .credential
            .filter(|token| !token.is_empty())
            .ok_or(GateError::MissingCredential)?;

        if self
            .revocations
            .is_revoked(&credential)
            .await
            .map_err(|err| GateError::Revocation(err.to_string()))?
        {
            return Err(GateError::RevokedCredential);
        }

        let identity = self
            .verifier
            .verify(&credential)
            .map_err(|err| GateError::InvalidCredential(err.to_string()))?;

        // Persisted membership is best-effort; live presence stays
        // authoritative even if the append fails.
        if let Err(error) = self.resolver.append_member(&room.id, &identity).await {
            warn!(%error, room = %room.id, "failed to persist room membership");
        }

        let admission = self.registry.admit(&room.id, &identity).await;
        self.registry
            .publish(
                &room.id,
                RoomEvent::to_all(ServerEvent::RoomMembers {
                    members: admission.members,
                }),
            )
            .await;

        info!(user = %identity.email, room = %room.id, "connection admitted");

        let connection = AdmittedConnection {
            id: ConnectionId::next(),
            identity,
            room_id: room.id,
            closed: AtomicBool::new(false),
        };
        Ok((connection, admission.receiver))
    }

    /// Release a connection's room seat and notify the remaining members.
    /// Idempotent; only the first call takes effect.
    pub async fn close(&self, connection: &AdmittedConnection) {
        if connection.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let members = self
            .registry
            .remove(&connection.room_id, &connection.identity.id)
            .await;
        if !members.is_empty() {
            self.registry
                .publish(
                    &connection.room_id,
                    RoomEvent::to_all(ServerEvent::RoomMembers { members }),
                )
                .await;
        }

        info!(user = %connection.identity.email, room = %connection.room_id, "connection closed");
    }
}
