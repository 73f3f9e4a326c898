//! Message payloads as they travel over a connection.
//!
//! A payload keeps the framing it arrived with so relayed traffic can be passed
//! on byte-for-byte.

use bytes::Bytes;

use crate::CONTROL_MARKER;

/// A single message frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Bytes),
}

impl Payload {
    /// Create a text payload.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a binary payload.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::Binary(data.into())
    }

    /// Get the payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    /// Check if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short label for the framing, used in logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Binary(_) => "binary",
        }
    }

    /// Extract the command text if this payload is a control message.
    ///
    /// Binary payloads are decoded as UTF-8 for the check only. Anything that
    /// fails to decode or lacks the leading marker is regular traffic and
    /// yields `None`.
    #[must_use]
    pub fn control_text(&self) -> Option<&str> {
        let text = match self {
            Self::Text(text) => text.as_str(),
            Self::Binary(data) => std::str::from_utf8(data).ok()?,
        };
        text.strip_prefix(CONTROL_MARKER)
    }

    /// Re-frame this payload for a recipient.
    ///
    /// Binary recipients get every payload as a binary frame. Text recipients
    /// get text as-is; binary payloads cannot be delivered to them and yield
    /// `None`.
    #[must_use]
    pub fn framed_for(&self, binary: bool) -> Option<Payload> {
        match (self, binary) {
            (Self::Text(text), true) => Some(Self::Binary(Bytes::copy_from_slice(text.as_bytes()))),
            (Self::Binary(data), true) => Some(Self::Binary(data.clone())),
            (Self::Text(text), false) => Some(Self::Text(text.clone())),
            (Self::Binary(_), false) => None,
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for Payload {
    fn from(data: Bytes) -> Self {
        Self::Binary(data)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(data))
    }
}
