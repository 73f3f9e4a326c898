//! Room directory.
//!
//! Maps each room to its member connections. Rooms exist only while they have
//! members: the last member to leave removes the entry.

use crate::connection::{ConnectionId, ConnectionRef};
use crate::room::RoomName;
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::debug;

/// Room directory (room -> member connections).
#[derive(Default)]
pub struct RoomDirectory {
    rooms: DashMap<RoomName, HashMap<ConnectionId, ConnectionRef>>,
}

impl RoomDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection` to `room`, creating the room if needed.
    ///
    /// Returns `true` if the connection was not already a member.
    pub fn join(&self, room: &str, connection: &ConnectionRef) -> bool {
        let mut members = self.rooms.entry(room.to_string()).or_insert_with(|| {
            debug!(room = %room, "Creating room");
            HashMap::new()
        });
        members
            .insert(connection.id().clone(), connection.clone())
            .is_none()
    }

    /// Remove `id` from `room`.
    ///
    /// Returns `true` if it was a member.
    pub fn leave(&self, room: &str, id: &ConnectionId) -> bool {
        let removed = self
            .rooms
            .get_mut(room)
            .is_some_and(|mut members| members.remove(id).is_some());

        if removed {
            // Only drops the entry if nobody joined in between.
            if self
                .rooms
                .remove_if(room, |_, members| members.is_empty())
                .is_some()
            {
                debug!(room = %room, "Deleted empty room");
            }
        }

        removed
    }

    /// Remove `id` from every room, returning the rooms it was removed from.
    pub fn leave_all(&self, id: &ConnectionId) -> Vec<RoomName> {
        let mut left = Vec::new();
        self.rooms.retain(|name, members| {
            if members.remove(id).is_some() {
                left.push(name.clone());
            }
            !members.is_empty()
        });
        left
    }

    /// Snapshot the members of `room`. Empty if the room does not exist.
    #[must_use]
    pub fn members_of(&self, room: &str) -> Vec<ConnectionRef> {
        self.rooms
            .get(room)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if `id` is a member of `room`.
    #[must_use]
    pub fn is_member(&self, room: &str, id: &ConnectionId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|members| members.contains_key(id))
    }

    /// Rooms `id` is a member of.
    #[must_use]
    pub fn rooms_of(&self, id: &ConnectionId) -> Vec<RoomName> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().contains_key(id))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of members in `room`.
    #[must_use]
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map(|members| members.len()).unwrap_or(0)
    }

    /// Check if a room exists.
    #[must_use]
    pub fn room_exists(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    /// Number of non-empty rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
