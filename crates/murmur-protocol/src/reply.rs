//! Server-to-client control messages.

use std::fmt;

use crate::payload::Payload;
use crate::CONTROL_MARKER;

/// Numeric protocol error codes carried in `ERR` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// The connection is not in a room.
    NotInChannel = 10,
    /// `join` named the room the connection is already in.
    AlreadyInChannel = 11,
    /// The control text matched no command.
    UnknownCommand = 19,
}

impl ErrorCode {
    /// Get the numeric code.
    #[must_use]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Human-readable reason sent after the code.
    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            Self::NotInChannel => "not in a channel",
            Self::AlreadyInChannel => "already in this channel",
            Self::UnknownCommand => "unknown command",
        }
    }
}

/// A control reply or notification.
///
/// Rendered with a leading [`CONTROL_MARKER`] so clients can tell it apart
/// from relayed traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `JOIN <room>` - the connection joined a room.
    Join(String),
    /// `JOIND` - another connection joined the recipient's room.
    Joined,
    /// `LEFT` - the connection left its room.
    Left,
    /// `LEFTD` - another connection left the recipient's room.
    PeerLeft,
    /// `CURRENT <room>` - answer to `where`.
    Current(String),
    /// `RANDOMIZED <room>` - answer to `random`.
    Randomized(String),
    /// `BINARY ON` - binary framing enabled.
    BinaryOn,
    /// `ERR <code> <reason>`.
    Error(ErrorCode),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONTROL_MARKER}")?;
        match self {
            Self::Join(room) => write!(f, "JOIN {room}"),
            Self::Joined => f.write_str("JOIND"),
            Self::Left => f.write_str("LEFT"),
            Self::PeerLeft => f.write_str("LEFTD"),
            Self::Current(room) => write!(f, "CURRENT {room}"),
            Self::Randomized(room) => write!(f, "RANDOMIZED {room}"),
            Self::BinaryOn => f.write_str("BINARY ON"),
            Self::Error(code) => write!(f, "ERR {} {}", code.code(), code.reason()),
        }
    }
}

impl From<Reply> for Payload {
    fn from(reply: Reply) -> Self {
        Payload::Text(reply.to_string())
    }
}
