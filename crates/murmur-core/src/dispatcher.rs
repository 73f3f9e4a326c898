//! Control command execution.
//!
//! Each handler mutates the registry and directory under the membership lock,
//! drops the lock, and only then sends replies and notifications.

use crate::connection::ConnectionRef;
use crate::relay::{Outcome, RelayEngine};
use crate::room::{random_room_name, RoomName};
use murmur_protocol::{Command, ErrorCode, Reply};
use tracing::{debug, warn};

impl RelayEngine {
    /// Parse and execute control text (marker already stripped).
    pub async fn dispatch(&self, connection: &ConnectionRef, text: &str) -> Outcome {
        let command = match Command::parse(text) {
            Ok(command) => command,
            Err(e) => {
                warn!(connection = %connection.id(), error = %e, "Unknown command");
                self.reply(connection, Reply::Error(ErrorCode::UnknownCommand))
                    .await;
                return Outcome::UnknownCommand;
            }
        };

        debug!(connection = %connection.id(), command = command.verb(), "Control command");
        self.execute(connection, &command).await;
        Outcome::Command(command)
    }

    /// Execute an already-parsed command.
    pub async fn execute(&self, connection: &ConnectionRef, command: &Command) {
        match command {
            Command::Join(room) => self.join(connection, room).await,
            Command::Leave => self.leave(connection).await,
            Command::Where => self.where_is(connection).await,
            Command::Random => {
                self.random(connection).await;
            }
            Command::Pass => {}
            Command::BinaryOn => self.binary_on(connection).await,
        }
    }

    /// Move `connection` into `room`.
    ///
    /// Existing members of `room` get `JOIND` before the newcomer is added.
    /// The room the connection came from is not notified.
    pub async fn join(&self, connection: &ConnectionRef, room: &str) {
        let Some(existing) = self.enter_room(connection, room) else {
            self.reply(connection, Reply::Error(ErrorCode::AlreadyInChannel))
                .await;
            return;
        };

        debug!(
            connection = %connection.id(),
            room = %room,
            members = existing.len() + 1,
            "Joined room"
        );

        self.broadcast(&existing, &Reply::Joined).await;
        self.reply(connection, Reply::Join(room.to_string())).await;
    }

    /// Take `connection` out of its room. Always answers `LEFT`.
    pub async fn leave(&self, connection: &ConnectionRef) {
        if let Some((room, remaining)) = self.exit_room(connection) {
            debug!(connection = %connection.id(), room = %room, "Left room");
            self.broadcast(&remaining, &Reply::PeerLeft).await;
        }
        self.reply(connection, Reply::Left).await;
    }

    /// Report the current room of `connection`.
    pub async fn where_is(&self, connection: &ConnectionRef) {
        let reply = match self.registry.room_of(connection.id()) {
            Some(room) => Reply::Current(room),
            None => Reply::Error(ErrorCode::NotInChannel),
        };
        self.reply(connection, reply).await;
    }

    /// Leave, then join a freshly generated room. Returns the room name.
    pub async fn random(&self, connection: &ConnectionRef) -> RoomName {
        self.leave(connection).await;
        let room = random_room_name();
        self.join(connection, &room).await;
        self.reply(connection, Reply::Randomized(room.clone())).await;
        room
    }

    /// Switch outbound framing for `connection` to binary.
    pub async fn binary_on(&self, connection: &ConnectionRef) {
        self.registry.set_binary(connection.id(), true);
        self.reply(connection, Reply::BinaryOn).await;
    }

    /// Membership half of `join`.
    ///
    /// Returns the members of `room` before the connection was added, or
    /// `None` if it is already a member.
    fn enter_room(&self, connection: &ConnectionRef, room: &str) -> Option<Vec<ConnectionRef>> {
        let _guard = self.write_membership();

        if self.directory.is_member(room, connection.id()) {
            return None;
        }

        self.directory.leave_all(connection.id());
        let existing = self.directory.members_of(room);
        self.directory.join(room, connection);
        self.registry.set_room(connection.id(), room);

        Some(existing)
    }

    /// Membership half of `leave`.
    ///
    /// Returns the recorded room and its remaining members, if there was one.
    fn exit_room(&self, connection: &ConnectionRef) -> Option<(RoomName, Vec<ConnectionRef>)> {
        let _guard = self.write_membership();

        self.directory.leave_all(connection.id());
        let room = self.registry.clear_room(connection.id())?;
        let remaining = self.directory.members_of(&room);

        Some((room, remaining))
    }
}
