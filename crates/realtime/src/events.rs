//! Wire event types for the room protocol.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use huddle_identity::Identity;

/// Sender identity attached to AI-generated replies.
pub const AI_SENDER_ID: &str = "ai";
pub const AI_SENDER_EMAIL: &str = "AI";

/// Process-unique identifier for one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A room participant as seen on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Peer {
    pub id: String,
    pub email: String,
}

impl Peer {
    /// The synthetic participant AI replies are attributed to.
    pub fn ai() -> Self {
        Self {
            id: AI_SENDER_ID.to_string(),
            email: AI_SENDER_EMAIL.to_string(),
        }
    }
}

impl From<&Identity> for Peer {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
        }
    }
}

/// Events received from clients. Sender identity is never taken from the
/// payload; it always comes from the verified connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "chat-message")]
    ChatMessage { message: String },
}

/// Events sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "chat-message")]
    ChatMessage { message: String, sender: Peer },
    /// Current member roster, emitted on every admit and every remove.
    #[serde(rename = "room-members")]
    RoomMembers { members: Vec<Peer> },
}

/// Envelope carried on a room's broadcast channel. `exclude` suppresses
/// delivery to a single connection (the sender of a human message).
#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub event: ServerEvent,
    pub exclude: Option<ConnectionId>,
}

impl RoomEvent {
    pub fn to_all(event: ServerEvent) -> Self {
        Self {
            event,
            exclude: None,
        }
    }

    pub fn excluding(event: ServerEvent, connection: ConnectionId) -> Self {
        Self {
            event,
            exclude: Some(connection),
        }
    }

    /// Whether the transport should deliver this envelope to `connection`.
    pub fn visible_to(&self, connection: ConnectionId) -> bool {
        self.exclude != Some(connection)
    }
}
