//! Transport abstraction traits for Murmur.
//!
//! These traits define what the server needs from a transport: a way to accept
//! links, a handshake to finish per link, and then a stream of inbound events.
//!
//! Accepting and handshaking are separate steps so a client that never
//! finishes its handshake only stalls its own task, not the accept loop.

use async_trait::async_trait;
use murmur_core::ConnectionRef;
use murmur_protocol::Payload;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Opening handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// One event read from a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A complete text or binary message.
    Message(Payload),
    /// The link reported an error. A [`Inbound::Closed`] follows.
    Error(String),
    /// The link is closed. No further events follow.
    Closed,
}

/// Read half of an accepted connection.
#[async_trait]
pub trait Receiver: Send {
    /// Wait for the next inbound event.
    ///
    /// Returns [`Inbound::Closed`] forever once the link has ended.
    async fn recv(&mut self) -> Inbound;
}

/// A freshly accepted connection.
pub struct Accepted {
    /// Handle the relay sends through.
    pub connection: ConnectionRef,
    /// Inbound event stream.
    pub receiver: Box<dyn Receiver>,
    /// Remote peer address, if known.
    pub remote_addr: Option<String>,
}

/// A link that has been accepted but not yet upgraded.
#[async_trait]
pub trait Handshake: Send {
    /// Remote peer address, if known.
    fn remote_addr(&self) -> Option<String>;

    /// Run the protocol handshake.
    async fn complete(self: Box<Self>) -> Result<Accepted, TransportError>;
}

/// A transport that can accept connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Accept a new link.
    ///
    /// Returns as soon as a peer connects. The handshake is left to
    /// [`Handshake::complete`], which callers should run on a task of its own.
    async fn accept(&self) -> Result<Box<dyn Handshake>, TransportError>;

    /// Get the transport name (e.g., "websocket").
    fn name(&self) -> &'static str;

    /// Check if the transport is healthy.
    fn is_healthy(&self) -> bool {
        true
    }
}
