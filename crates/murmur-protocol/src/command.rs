//! Control command grammar.
//!
//! Each form is anchored at the start of the command text only; whatever
//! follows a recognised verb is ignored, so `leave lobby` is a `leave`. The
//! verbs share no prefix, so the order they are tried in never matters.

use thiserror::Error;

/// Maximum room name length accepted by `join`.
pub const MAX_ROOM_NAME_LENGTH: usize = 32;

/// Protocol errors that can occur while reading control text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Control text matched none of the known command forms.
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),
}

/// A parsed control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `join <name>` - move into the named room.
    Join(String),
    /// `leave` - leave the current room.
    Leave,
    /// `where` - report the current room.
    Where,
    /// `random` - leave, then join a freshly generated room.
    Random,
    /// `pass <anything>` - do nothing.
    Pass,
    /// `binary on` - switch outbound framing to binary.
    BinaryOn,
}

impl Command {
    /// Parse command text with the control marker already stripped.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownCommand`] if the text matches no form.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        if let Some(rest) = text.strip_prefix("join ") {
            let len = rest
                .bytes()
                .take(MAX_ROOM_NAME_LENGTH)
                .take_while(|&b| is_room_name_byte(b))
                .count();
            if len > 0 {
                return Ok(Self::Join(rest[..len].to_string()));
            }
        } else if text.starts_with("leave") {
            return Ok(Self::Leave);
        } else if text.starts_with("where") {
            return Ok(Self::Where);
        } else if text.starts_with("random") {
            return Ok(Self::Random);
        } else if text.starts_with("pass") {
            return Ok(Self::Pass);
        } else if text.starts_with("binary on") {
            return Ok(Self::BinaryOn);
        }

        Err(ProtocolError::UnknownCommand(text.to_string()))
    }

    /// Command verb, used for logging and metrics labels.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Leave => "leave",
            Self::Where => "where",
            Self::Random => "random",
            Self::Pass => "pass",
            Self::BinaryOn => "binary",
        }
    }
}

/// Check a room name against the `join` charset `[a-zA-Z_\-0-9]{1,32}`.
#[must_use]
pub fn is_valid_room_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_ROOM_NAME_LENGTH
        && name.bytes().all(is_room_name_byte)
}

fn is_room_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("leave"), Ok(Command::Leave));
        assert_eq!(Command::parse("where"), Ok(Command::Where));
        assert_eq!(Command::parse("random"), Ok(Command::Random));
        assert_eq!(Command::parse("binary on"), Ok(Command::BinaryOn));
    }

    #[test]
    fn test_parse_join() {
        assert_eq!(
            Command::parse("join lobby"),
            Ok(Command::Join("lobby".to_string()))
        );
        assert_eq!(
            Command::parse("join my_room-42"),
            Ok(Command::Join("my_room-42".to_string()))
        );
    }

    #[test]
    fn test_parse_join_takes_leading_name() {
        let join = |name: &str| Ok(Command::Join(name.to_string()));

        assert_eq!(Command::parse("join lob by"), join("lob"));
        assert_eq!(Command::parse("join caf\u{e9}"), join("caf"));
        assert_eq!(Command::parse("join room!"), join("room"));
        assert_eq!(
            Command::parse(&format!("join {}", "a".repeat(40))),
            join(&"a".repeat(MAX_ROOM_NAME_LENGTH))
        );
    }

    #[test]
    fn test_parse_join_rejects_missing_name() {
        assert!(Command::parse("join").is_err());
        assert!(Command::parse("join ").is_err());
        assert!(Command::parse("join !lobby").is_err());
        assert!(Command::parse("joinlobby").is_err());
    }

    #[test]
    fn test_parse_ignores_trailing_text() {
        assert_eq!(Command::parse("leave lobby"), Ok(Command::Leave));
        assert_eq!(Command::parse("wherever"), Ok(Command::Where));
        assert_eq!(Command::parse("random please"), Ok(Command::Random));
        assert_eq!(Command::parse("binary only"), Ok(Command::BinaryOn));
        assert_eq!(Command::parse("password"), Ok(Command::Pass));
    }

    #[test]
    fn test_parse_pass() {
        assert_eq!(Command::parse("pass"), Ok(Command::Pass));
        assert_eq!(Command::parse("pass anything at all"), Ok(Command::Pass));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            Command::parse("frobnicate"),
            Err(ProtocolError::UnknownCommand("frobnicate".to_string()))
        );
        assert!(Command::parse("").is_err());
        assert!(Command::parse("binary off").is_err());
        assert!(Command::parse("LEAVE").is_err());
        assert!(Command::parse(" leave").is_err());
    }

    #[test]
    fn test_room_name_validation() {
        assert!(is_valid_room_name("a"));
        assert!(is_valid_room_name("Room_1-b"));
        assert!(!is_valid_room_name(""));
        assert!(!is_valid_room_name("a.b"));
        assert!(!is_valid_room_name(&"x".repeat(MAX_ROOM_NAME_LENGTH + 1)));
    }
}
