//! # murmur-protocol
//!
//! Wire definitions for the Murmur room relay.
//!
//! Murmur carries two kinds of traffic over the same link:
//!
//! - **Relayed payloads** - opaque text or binary messages passed between room members untouched
//! - **Control messages** - commands and replies prefixed with [`CONTROL_MARKER`]
//!
//! ## Commands
//!
//! - `join <name>` / `leave` - Room membership
//! - `where` - Query the current room
//! - `random` - Move into a freshly generated room
//! - `binary on` - Switch outbound framing to binary
//! - `pass <anything>` - No-op
//!
//! ## Example
//!
//! ```rust
//! use murmur_protocol::{Command, Payload, Reply};
//!
//! let inbound = Payload::text("\u{200B}join lobby");
//! let command = Command::parse(inbound.control_text().unwrap()).unwrap();
//! assert_eq!(command, Command::Join("lobby".to_string()));
//!
//! let reply = Reply::Join("lobby".to_string());
//! assert_eq!(reply.to_string(), "\u{200B}JOIN lobby");
//! ```

pub mod command;
pub mod payload;
pub mod reply;

pub use command::{is_valid_room_name, Command, ProtocolError, MAX_ROOM_NAME_LENGTH};
pub use payload::Payload;
pub use reply::{ErrorCode, Reply};

/// Leading code point of every control message (U+200B ZERO WIDTH SPACE).
pub const CONTROL_MARKER: char = '\u{200B}';
