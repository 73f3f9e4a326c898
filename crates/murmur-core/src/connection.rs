//! Connection handles as seen by the relay.
//!
//! The relay never reads from a connection. Transports feed it inbound
//! payloads and hand it a [`Connection`] it can send replies and relayed
//! traffic through.

use async_trait::async_trait;
use murmur_protocol::Payload;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Counter backing [`ConnectionId::generate`].
static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Create a new connection ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a process-unique connection ID.
    #[must_use]
    pub fn generate() -> Self {
        let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("conn_{n:x}"))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Failure delivering a single frame.
#[derive(Debug, Error)]
pub enum SendError {
    /// Connection was closed.
    #[error("Connection closed")]
    Closed,

    /// The transport rejected the frame.
    #[error("Send failed: {0}")]
    Failed(String),
}

/// An open client link the relay can deliver frames to.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the connection's unique identifier.
    fn id(&self) -> &ConnectionId;

    /// Send one frame, framed exactly as given.
    ///
    /// May wait on transport backpressure.
    async fn send(&self, payload: Payload) -> Result<(), SendError>;

    /// Check if the connection has been closed.
    fn is_closed(&self) -> bool;
}

/// Shared handle to a connection.
pub type ConnectionRef = Arc<dyn Connection>;
