//! Authoritative in-memory mapping of room to live member set.
//!
//! Rooms are created on first admit and discarded when the member set
//! empties. Presence is deduplicated by identity: one identity holding
//! several connections occupies a single seat with a connection count, and
//! leaves the roster only when the last of them closes.

use std::collections::HashMap;

use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use huddle_identity::Identity;

use crate::events::{Peer, RoomEvent};

/// Capacity of each room's broadcast channel. Lagging receivers are dropped
/// by the channel rather than ever blocking delivery to others.
pub const BROADCAST_CAPACITY: usize = 128;

struct Seat {
    peer: Peer,
    connections: usize,
}

struct Room {
    /// Seats in join order; the roster events preserve it.
    seats: Vec<Seat>,
    sender: broadcast::Sender<RoomEvent>,
}

impl Room {
    fn new() -> Self {
        Self {
            seats: Vec::new(),
            sender: broadcast::channel(BROADCAST_CAPACITY).0,
        }
    }

    fn members(&self) -> Vec<Peer> {
        self.seats.iter().map(|seat| seat.peer.clone()).collect()
    }
}

/// The result of admitting one connection into a room.
pub struct Admission {
    /// Roster after the admit, in join order.
    pub members: Vec<Peer>,
    /// Subscription delivering every event published to the room from this
    /// point on.
    pub receiver: broadcast::Receiver<RoomEvent>,
}

/// All room mutation goes through one async lock, so concurrent admits and
/// removes for the same room are linearized and cannot lose updates.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Register an identity in a room, creating the room if needed.
    /// Re-admitting a present identity only bumps its connection count.
    pub async fn admit(&self, room_id: &str, identity: &Identity) -> Admission {
        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(room_id.to_string()).or_insert_with(Room::new);

        match room
            .seats
            .iter_mut()
            .find(|seat| seat.peer.id == identity.id)
        {
            Some(seat) => seat.connections += 1,
            None => room.seats.push(Seat {
                peer: Peer::from(identity),
                connections: 1,
            }),
        }

        Admission {
            members: room.members(),
            receiver: room.sender.subscribe(),
        }
    }

    /// Drop one connection of an identity. The identity leaves the roster
    /// when its last connection goes; the room is discarded once empty.
    /// Returns the roster after the removal.
    pub async fn remove(&self, room_id: &str, identity_id: &str) -> Vec<Peer> {
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return Vec::new();
        };

        if let Some(index) = room
            .seats
            .iter()
            .position(|seat| seat.peer.id == identity_id)
        {
            let seat = &mut room.seats[index];
            seat.connections = seat.connections.saturating_sub(1);
            if seat.connections == 0 {
                room.seats.remove(index);
            }
        }

        if room.seats.is_empty() {
            rooms.remove(room_id);
            debug!(room = room_id, "discarded empty room");
            return Vec::new();
        }

        room.members()
    }

    /// Current roster of a room, in join order.
    pub async fn members_of(&self, room_id: &str) -> Vec<Peer> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id)
            .map(Room::members)
            .unwrap_or_default()
    }

    /// Fan an event out to every subscribed connection of a room.
    /// Fire-and-forget: returns how many receivers the event reached,
    /// zero when the room no longer exists.
    pub async fn publish(&self, room_id: &str, event: RoomEvent) -> usize {
        let rooms = self.rooms.lock().await;
        match rooms.get(room_id) {
            Some(room) => room.sender.send(event).unwrap_or(0),
            None => 0,
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
