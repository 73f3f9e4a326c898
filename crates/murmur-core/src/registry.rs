//! Per-connection relay state.
//!
//! The registry records which room each connection is in and how outbound
//! frames to it are framed. Entries are created on first write and removed
//! by [`ConnectionRegistry::forget`].

use crate::connection::ConnectionId;
use crate::room::RoomName;
use dashmap::DashMap;
use tracing::trace;

/// State tracked for one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    /// Current room, if any.
    pub room: Option<RoomName>,
    /// Whether outbound frames are sent as binary.
    pub binary: bool,
}

/// Connection registry (connection -> room and framing mode).
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionState>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as being in `room`.
    pub fn set_room(&self, id: &ConnectionId, room: impl Into<RoomName>) {
        let room = room.into();
        trace!(connection = %id, room = %room, "Recording room");
        self.connections.entry(id.clone()).or_default().room = Some(room);
    }

    /// Clear the room mapping for `id`, returning the room it was in.
    pub fn clear_room(&self, id: &ConnectionId) -> Option<RoomName> {
        self.connections
            .get_mut(id)
            .and_then(|mut state| state.room.take())
    }

    /// Get the room `id` is in.
    #[must_use]
    pub fn room_of(&self, id: &ConnectionId) -> Option<RoomName> {
        self.connections
            .get(id)
            .and_then(|state| state.room.clone())
    }

    /// Set the binary framing flag for `id`.
    pub fn set_binary(&self, id: &ConnectionId, binary: bool) {
        self.connections.entry(id.clone()).or_default().binary = binary;
    }

    /// Check whether `id` receives binary frames. Unknown connections don't.
    #[must_use]
    pub fn is_binary(&self, id: &ConnectionId) -> bool {
        self.connections
            .get(id)
            .map(|state| state.binary)
            .unwrap_or(false)
    }

    /// Get a copy of the state recorded for `id`.
    #[must_use]
    pub fn get(&self, id: &ConnectionId) -> Option<ConnectionState> {
        self.connections.get(id).map(|state| state.clone())
    }

    /// Remove every entry for `id`, returning what was recorded.
    pub fn forget(&self, id: &ConnectionId) -> Option<ConnectionState> {
        self.connections.remove(id).map(|(_, state)| state)
    }

    /// Number of connections with recorded state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
