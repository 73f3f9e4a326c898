//! # murmur-transport
//!
//! Transport layer for the Murmur relay.
//!
//! A transport accepts client links and splits each one into two halves:
//!
//! - a [`ConnectionRef`](murmur_core::ConnectionRef) the relay engine sends through
//! - a [`Receiver`] the server reads [`Inbound`] events from
//!
//! ```rust,ignore
//! use murmur_transport::{Inbound, Transport, WebSocketTransport};
//!
//! let transport = WebSocketTransport::bind("127.0.0.1:8765".parse()?).await?;
//! let mut accepted = transport.accept().await?.complete().await?;
//! while let Inbound::Message(payload) = accepted.receiver.recv().await {
//!     engine.handle(&accepted.connection, payload).await;
//! }
//! engine.disconnect(&accepted.connection).await;
//! ```

pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use traits::{Accepted, Handshake, Inbound, Receiver, Transport, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::{PendingUpgrade, WebSocketConfig, WebSocketConnection, WebSocketTransport};
