//! The relay engine.
//!
//! Every inbound payload from a connection goes through [`RelayEngine::handle`],
//! which either hands control text to the command dispatcher or fans regular
//! traffic out to the other members of the sender's room.
//!
//! Registry and directory updates that belong together (leave every room,
//! snapshot, add, record) happen under one membership lock, and the lock is
//! always released before any frame is sent. Fan-out reads a member snapshot
//! taken under the same lock, so a frame is never relayed to a connection that
//! has already switched rooms.

use crate::connection::ConnectionRef;
use crate::directory::RoomDirectory;
use crate::registry::ConnectionRegistry;
use crate::room::RoomName;
use murmur_protocol::{Command, ErrorCode, Payload, Reply};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, trace};

/// What the engine did with an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Regular traffic was fanned out to the sender's room.
    Relayed {
        /// Room the payload was relayed in.
        room: RoomName,
        /// Members the payload was delivered to.
        recipients: usize,
    },
    /// Regular traffic from a connection outside any room.
    NotInRoom,
    /// A control command was executed.
    Command(Command),
    /// Control text matched no command.
    UnknownCommand,
}

/// The central relay.
pub struct RelayEngine {
    /// Connection -> room and framing mode.
    pub(crate) registry: ConnectionRegistry,
    /// Room -> members.
    pub(crate) directory: RoomDirectory,
    /// Serializes compound membership changes against fan-out snapshots.
    membership: RwLock<()>,
}

impl RelayEngine {
    /// Create an engine with no rooms and no connections.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            directory: RoomDirectory::new(),
            membership: RwLock::new(()),
        }
    }

    /// Get the connection registry.
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get the room directory.
    #[must_use]
    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    /// Get engine statistics.
    #[must_use]
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            room_count: self.directory.room_count(),
            connection_count: self.registry.len(),
        }
    }

    /// Process one inbound payload from `connection`.
    ///
    /// All replies and relayed frames have been issued when this returns.
    pub async fn handle(&self, connection: &ConnectionRef, payload: Payload) -> Outcome {
        if let Some(text) = payload.control_text() {
            return self.dispatch(connection, text).await;
        }
        self.relay(connection, &payload).await
    }

    /// Fan regular traffic out to every other member of the sender's room.
    async fn relay(&self, connection: &ConnectionRef, payload: &Payload) -> Outcome {
        let Some((room, members)) = self.room_snapshot(connection) else {
            self.reply(connection, Reply::Error(ErrorCode::NotInChannel))
                .await;
            return Outcome::NotInRoom;
        };

        debug!(
            connection = %connection.id(),
            room = %room,
            size = payload.len(),
            "Forwarding to {} connections",
            members.len().saturating_sub(1)
        );

        let mut recipients = 0;
        for member in members.iter().filter(|m| m.id() != connection.id()) {
            if self.deliver(member, payload).await {
                recipients += 1;
            }
        }

        Outcome::Relayed { room, recipients }
    }

    /// Tear down all state for a closed connection.
    ///
    /// Former room-mates get `LEFTD`. Returns the number notified.
    pub async fn disconnect(&self, connection: &ConnectionRef) -> usize {
        let former = {
            let _guard = self.write_membership();
            self.directory.leave_all(connection.id());
            self.registry
                .forget(connection.id())
                .and_then(|state| state.room)
                .map(|room| {
                    let members = self.directory.members_of(&room);
                    (room, members)
                })
        };

        let notified = match former {
            Some((room, members)) => {
                debug!(connection = %connection.id(), room = %room, "Connection left room on close");
                self.broadcast(&members, &Reply::PeerLeft).await
            }
            None => 0,
        };

        info!(connection = %connection.id(), "Connection closed");
        notified
    }

    /// Deliver `payload` to `to`, framed for its binary mode.
    ///
    /// Closed connections, framing mismatches and send failures are all
    /// swallowed. Returns `true` if a frame was handed to the transport.
    pub async fn deliver(&self, to: &ConnectionRef, payload: &Payload) -> bool {
        if to.is_closed() {
            trace!(connection = %to.id(), "Skipping closed connection");
            return false;
        }

        let Some(frame) = payload.framed_for(self.registry.is_binary(to.id())) else {
            trace!(connection = %to.id(), "Dropping binary payload for text-mode connection");
            return false;
        };

        match to.send(frame).await {
            Ok(()) => true,
            Err(e) => {
                trace!(connection = %to.id(), error = %e, "Delivery failed");
                false
            }
        }
    }

    /// Send a control reply to one connection.
    pub(crate) async fn reply(&self, to: &ConnectionRef, reply: Reply) {
        self.deliver(to, &reply.into()).await;
    }

    /// Send the same notification to every connection in `members`.
    pub(crate) async fn broadcast(&self, members: &[ConnectionRef], reply: &Reply) -> usize {
        let payload: Payload = reply.clone().into();
        let mut count = 0;
        for member in members {
            if self.deliver(member, &payload).await {
                count += 1;
            }
        }
        count
    }

    /// Current room of `connection` with a snapshot of its members.
    fn room_snapshot(&self, connection: &ConnectionRef) -> Option<(RoomName, Vec<ConnectionRef>)> {
        let _guard = self.read_membership();
        let room = self.registry.room_of(connection.id())?;
        let members = self.directory.members_of(&room);
        Some((room, members))
    }

    pub(crate) fn read_membership(&self) -> RwLockReadGuard<'_, ()> {
        self.membership
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_membership(&self) -> RwLockWriteGuard<'_, ()> {
        self.membership
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RelayEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Relay statistics.
#[derive(Debug, Clone)]
pub struct RelayStats {
    /// Number of non-empty rooms.
    pub room_count: usize,
    /// Number of connections with recorded state.
    pub connection_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection as _;
    use crate::testing::{wire, MockConnection};
    use bytes::Bytes;

    async fn join(engine: &RelayEngine, conn: &ConnectionRef, room: &str) {
        engine
            .handle(conn, Payload::text(format!("\u{200B}join {room}")))
            .await;
    }

    #[tokio::test]
    async fn test_fan_out_skips_sender() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");
        let b = MockConnection::new("b");
        let c = MockConnection::new("c");

        for conn in [&a, &b, &c] {
            join(&engine, &conn.handle(), "r").await;
        }
        a.take();
        b.take();
        c.take();

        let outcome = engine.handle(&a.handle(), Payload::text("hello")).await;
        assert_eq!(
            outcome,
            Outcome::Relayed {
                room: "r".to_string(),
                recipients: 2
            }
        );

        assert!(a.take().is_empty());
        assert_eq!(b.take(), vec![Payload::text("hello")]);
        assert_eq!(c.take(), vec![Payload::text("hello")]);
    }

    #[tokio::test]
    async fn test_relay_without_room() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");

        let outcome = engine.handle(&a.handle(), Payload::text("hello")).await;
        assert_eq!(outcome, Outcome::NotInRoom);
        assert_eq!(
            a.take_text(),
            vec![wire(Reply::Error(ErrorCode::NotInChannel))]
        );
    }

    #[tokio::test]
    async fn test_relay_stays_in_room() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");
        let b = MockConnection::new("b");
        let c = MockConnection::new("c");

        join(&engine, &a.handle(), "one").await;
        join(&engine, &b.handle(), "one").await;
        join(&engine, &c.handle(), "two").await;
        b.take();
        c.take();

        engine.handle(&a.handle(), Payload::text("hi")).await;
        assert_eq!(b.take().len(), 1);
        assert!(c.take().is_empty());
    }

    #[tokio::test]
    async fn test_binary_payload_preserved_for_binary_recipient() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");
        let b = MockConnection::new("b");

        join(&engine, &a.handle(), "r").await;
        join(&engine, &b.handle(), "r").await;
        engine
            .handle(&b.handle(), Payload::text("\u{200B}binary on"))
            .await;
        b.take();

        let data = Bytes::from_static(&[0xFF, 0x00, 0x7F]);
        engine
            .handle(&a.handle(), Payload::Binary(data.clone()))
            .await;
        assert_eq!(b.take(), vec![Payload::Binary(data)]);
    }

    #[tokio::test]
    async fn test_binary_payload_dropped_for_text_recipient() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");
        let b = MockConnection::new("b");

        join(&engine, &a.handle(), "r").await;
        join(&engine, &b.handle(), "r").await;
        b.take();

        let outcome = engine
            .handle(&a.handle(), Payload::binary(vec![1, 2, 3]))
            .await;
        assert_eq!(
            outcome,
            Outcome::Relayed {
                room: "r".to_string(),
                recipients: 0
            }
        );
        assert!(b.take().is_empty());
    }

    #[tokio::test]
    async fn test_text_reframed_for_binary_recipient() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");
        let b = MockConnection::new("b");

        join(&engine, &a.handle(), "r").await;
        join(&engine, &b.handle(), "r").await;
        engine
            .handle(&b.handle(), Payload::text("\u{200B}binary on"))
            .await;
        b.take();

        engine.handle(&a.handle(), Payload::text("hey")).await;
        assert_eq!(b.take(), vec![Payload::Binary(Bytes::from_static(b"hey"))]);
    }

    #[tokio::test]
    async fn test_binary_control_message_is_a_command() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");

        let outcome = engine
            .handle(
                &a.handle(),
                Payload::binary("\u{200B}join lobby".as_bytes().to_vec()),
            )
            .await;
        assert_eq!(outcome, Outcome::Command(Command::Join("lobby".into())));
        assert_eq!(a.take_text(), vec![wire(Reply::Join("lobby".into()))]);
    }

    #[tokio::test]
    async fn test_undecodable_binary_is_relayed() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");
        let b = MockConnection::new("b");

        join(&engine, &a.handle(), "r").await;
        join(&engine, &b.handle(), "r").await;
        engine
            .handle(&b.handle(), Payload::text("\u{200B}binary on"))
            .await;
        b.take();

        let data = vec![0xE2, 0x80, 0x8B, 0xFF];
        let outcome = engine.handle(&a.handle(), Payload::binary(data.clone())).await;
        assert!(matches!(outcome, Outcome::Relayed { recipients: 1, .. }));
        assert_eq!(b.take(), vec![Payload::binary(data)]);
    }

    #[tokio::test]
    async fn test_closed_and_failing_members_are_skipped() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");
        let b = MockConnection::new("b");
        let c = MockConnection::new("c");
        let d = MockConnection::new("d");

        for conn in [&a, &b, &c, &d] {
            join(&engine, &conn.handle(), "r").await;
        }
        d.take();

        b.close();
        c.fail_sends();

        let outcome = engine.handle(&a.handle(), Payload::text("still here")).await;
        assert!(matches!(outcome, Outcome::Relayed { recipients: 1, .. }));
        assert_eq!(d.take(), vec![Payload::text("still here")]);
    }

    #[tokio::test]
    async fn test_disconnect_notifies_and_cleans_up() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");
        let b = MockConnection::new("b");

        join(&engine, &a.handle(), "r").await;
        join(&engine, &b.handle(), "r").await;
        assert_eq!(
            a.take_text(),
            vec![wire(Reply::Join("r".into())), wire(Reply::Joined)]
        );
        b.take();

        a.close();
        let notified = engine.disconnect(&a.handle()).await;
        assert_eq!(notified, 1);
        assert_eq!(b.take_text(), vec![wire(Reply::PeerLeft)]);

        assert!(engine.registry().get(a.id()).is_none());
        assert!(!engine.directory().is_member("r", a.id()));

        // A newcomer only reaches B.
        let c = MockConnection::new("c");
        join(&engine, &c.handle(), "r").await;
        engine.handle(&c.handle(), Payload::text("\u{200B}where")).await;
        assert_eq!(
            c.take_text(),
            vec![wire(Reply::Join("r".into())), wire(Reply::Current("r".into()))]
        );

        let outcome = engine.handle(&c.handle(), Payload::text("yo")).await;
        assert!(matches!(outcome, Outcome::Relayed { recipients: 1, .. }));
        assert!(a.take().is_empty());
        assert_eq!(b.take_text(), vec![wire(Reply::Joined), "yo".to_string()]);
    }

    #[tokio::test]
    async fn test_disconnect_without_room() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");

        engine
            .handle(&a.handle(), Payload::text("\u{200B}binary on"))
            .await;
        assert_eq!(engine.disconnect(&a.handle()).await, 0);
        assert!(engine.registry().is_empty());
    }

    #[tokio::test]
    async fn test_last_member_disconnect_removes_room() {
        let engine = RelayEngine::new();
        let a = MockConnection::new("a");

        join(&engine, &a.handle(), "solo").await;
        assert_eq!(engine.stats().room_count, 1);

        engine.disconnect(&a.handle()).await;
        let stats = engine.stats();
        assert_eq!(stats.room_count, 0);
        assert_eq!(stats.connection_count, 0);
    }
}
