//! Shared application state for the gateway

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use huddle_config::AppConfig;
use huddle_identity::{Identity, RevocationStore, TokenAuthority};
use huddle_projects::{ProjectError, ProjectStore};
use huddle_realtime::{
    ConnectionGate, MessageRouter, ResolveError, RoomMetadata, RoomRegistry, RoomResolver,
};
use huddle_runtime::BackendServices;
use huddle_users::UserDirectory;

/// Shared application state containing all services
#[derive(Clone)]
pub struct GatewayState {
    pub users: UserDirectory,
    pub projects: ProjectStore,
    pub tokens: TokenAuthority,
    pub revocations: RevocationStore,
    /// Live presence, owned by the realtime core.
    pub registry: Arc<RoomRegistry>,
    pub gate: Arc<ConnectionGate>,
    pub router: Arc<MessageRouter>,
    /// How long a logged-out credential stays blacklisted.
    pub revocation_ttl: Duration,
}

impl GatewayState {
    pub fn new(services: BackendServices, config: &AppConfig) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let resolver = Arc::new(ProjectRoomResolver {
            projects: services.projects.clone(),
        });

        let gate = Arc::new(ConnectionGate::new(
            registry.clone(),
            services.tokens.clone(),
            services.revocations.clone(),
            resolver,
        ));
        let router = Arc::new(MessageRouter::new(registry.clone(), services.responder));

        Self {
            users: services.users,
            projects: services.projects,
            tokens: services.tokens,
            revocations: services.revocations,
            registry,
            gate,
            router,
            revocation_ttl: Duration::from_secs(config.auth.revocation_ttl_seconds),
        }
    }
}

/// Bridges the realtime handshake to persistent project storage. Live
/// presence stays in the registry; this adapter only resolves rooms and
/// records first-time joiners.
struct ProjectRoomResolver {
    projects: ProjectStore,
}

#[async_trait]
impl RoomResolver for ProjectRoomResolver {
    async fn resolve_room(&self, room_id: &str) -> Result<RoomMetadata, ResolveError> {
        match self.projects.resolve_room(room_id).await {
            Ok(room) => Ok(RoomMetadata {
                id: room.id,
                name: room.name,
            }),
            Err(ProjectError::NotFound) => Err(ResolveError::NotFound),
            Err(error) => Err(ResolveError::Backend(error.to_string())),
        }
    }

    async fn append_member(&self, room_id: &str, identity: &Identity) -> Result<(), ResolveError> {
        match self.projects.append_member(room_id, &identity.id).await {
            Ok(newly_added) => {
                if newly_added {
                    debug!(room = room_id, user = %identity.id, "persisted first-time member");
                }
                Ok(())
            }
            Err(ProjectError::NotFound) => Err(ResolveError::NotFound),
            Err(error) => Err(ResolveError::Backend(error.to_string())),
        }
    }
}
