//! # Huddle Realtime Core
//!
//! The room membership and message broadcast protocol: authenticated users
//! are bound to project-scoped rooms, membership stays consistent across
//! connects and disconnects, and messages fan out to the right subscriber set
//! with correct attribution.
//!
//! - [`registry::RoomRegistry`] — authoritative in-memory map of room to
//!   live member set, the source of truth for presence.
//! - [`gate::ConnectionGate`] — per-connection handshake that verifies the
//!   credential, resolves the target room, and admits or rejects.
//! - [`router::MessageRouter`] — classifies inbound chat events and plans
//!   the broadcast, detouring through the AI responder on mention.
//!
//! The core is transport-agnostic: the gateway owns the sockets and drives
//! these types.

pub mod events;
pub mod gate;
pub mod registry;
pub mod router;

pub use events::{ClientEvent, ConnectionId, Peer, RoomEvent, ServerEvent};
pub use gate::{
    AdmittedConnection, ConnectionGate, ConnectionPhase, GateError, HandshakeRequest,
    ResolveError, RoomMetadata, RoomResolver,
};
pub use registry::{Admission, RoomRegistry};
pub use router::{classify, ChatEvent, Classification, MessageRouter, RouteError, MENTION_TOKEN};
