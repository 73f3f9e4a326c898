//! # murmur-core
//!
//! Room membership and message relay for the Murmur realtime relay.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Connection** - Opaque handle to a client link, implemented by transports
//! - **Registry** - Per-connection state: current room and framing mode
//! - **Directory** - Room name to member set mapping
//! - **Relay** - Classifies inbound payloads and fans regular traffic out to a room
//! - **Dispatcher** - Executes control commands against the registry and directory
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Connection │────▶│ RelayEngine │────▶│  Directory  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │ Dispatcher  │────▶│  Registry   │
//!                     └─────────────┘     └─────────────┘
//! ```

pub mod connection;
pub mod directory;
pub mod dispatcher;
pub mod registry;
pub mod relay;
pub mod room;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{Connection, ConnectionId, ConnectionRef, SendError};
pub use directory::RoomDirectory;
pub use registry::ConnectionRegistry;
pub use relay::{Outcome, RelayEngine, RelayStats};
pub use room::{random_room_name, RoomName, RANDOM_ROOM_NAME_LENGTH};
