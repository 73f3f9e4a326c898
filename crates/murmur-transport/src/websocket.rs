//! WebSocket transport implementation.
//!
//! This module provides a WebSocket-based transport using tokio-tungstenite.
//! Each accepted socket is split: a writer task owns the sink and drains a
//! bounded queue fed by [`WebSocketConnection::send`], while the stream half is
//! read through [`WebSocketReceiver`].

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use murmur_core::{Connection, ConnectionId, SendError};
use murmur_protocol::Payload;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message},
    WebSocketStream,
};
use tracing::{debug, error, info, trace, warn};

use crate::traits::{Accepted, Handshake, Inbound, Receiver, Transport, TransportError};

/// WebSocket transport configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Frames queued per connection before `send` waits.
    pub outbound_buffer: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8765)),
            outbound_buffer: 1024,
        }
    }
}

/// WebSocket transport.
pub struct WebSocketTransport {
    listener: TcpListener,
    config: WebSocketConfig,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn new(config: WebSocketConfig) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(TransportError::Io)?;

        info!("WebSocket transport listening on {}", config.bind_addr);

        Ok(Self { listener, config })
    }

    /// Create a new WebSocket transport with default config.
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        Self::new(WebSocketConfig {
            bind_addr: addr,
            ..Default::default()
        })
        .await
    }

    /// Get the local address this transport is bound to.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn accept(&self) -> Result<Box<dyn Handshake>, TransportError> {
        let (stream, addr) = self.listener.accept().await.map_err(TransportError::Io)?;

        debug!("Accepted TCP connection from {}", addr);

        Ok(Box::new(PendingUpgrade {
            stream,
            addr,
            outbound_buffer: self.config.outbound_buffer,
        }))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// A TCP stream waiting for its WebSocket handshake.
pub struct PendingUpgrade {
    stream: TcpStream,
    addr: SocketAddr,
    outbound_buffer: usize,
}

#[async_trait]
impl Handshake for PendingUpgrade {
    fn remote_addr(&self) -> Option<String> {
        Some(self.addr.to_string())
    }

    async fn complete(self: Box<Self>) -> Result<Accepted, TransportError> {
        upgrade(self.stream, self.addr, self.outbound_buffer).await
    }
}

/// Run the WebSocket handshake on an accepted TCP stream.
///
/// # Errors
///
/// Returns an error if the handshake fails.
pub async fn upgrade(
    stream: TcpStream,
    addr: SocketAddr,
    outbound_buffer: usize,
) -> Result<Accepted, TransportError> {
    let ws_stream = accept_async(stream).await.map_err(|e| {
        warn!("WebSocket handshake failed with {}: {}", addr, e);
        TransportError::Handshake(e.to_string())
    })?;

    debug!("WebSocket handshake completed with {}", addr);

    let (sink, stream) = ws_stream.split();
    let (tx, rx) = mpsc::channel(outbound_buffer.max(1));
    let open = Arc::new(AtomicBool::new(true));
    let id = ConnectionId::generate();

    tokio::spawn(write_loop(id.clone(), sink, rx, open.clone()));

    Ok(Accepted {
        connection: Arc::new(WebSocketConnection {
            id,
            outbound: tx,
            open: open.clone(),
        }),
        receiver: Box::new(WebSocketReceiver {
            stream,
            open,
            ended: false,
        }),
        remote_addr: Some(addr.to_string()),
    })
}

/// Drain the outbound queue into the socket until every sender is gone.
async fn write_loop(
    id: ConnectionId,
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut rx: mpsc::Receiver<Message>,
    open: Arc<AtomicBool>,
) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = sink.send(message).await {
            debug!(connection = %id, error = %e, "WebSocket write failed");
            open.store(false, Ordering::SeqCst);
            break;
        }
    }

    if let Err(e) = sink.close().await {
        trace!(connection = %id, error = %e, "WebSocket close failed");
    }
}

/// Send half of a WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    outbound: mpsc::Sender<Message>,
    open: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for WebSocketConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn send(&self, payload: Payload) -> Result<(), SendError> {
        if !self.open.load(Ordering::SeqCst) {
            return Ok(());
        }

        let message = match payload {
            Payload::Text(text) => Message::Text(text),
            Payload::Binary(data) => Message::Binary(data.to_vec()),
        };

        self.outbound.send(message).await.map_err(|_| {
            self.open.store(false, Ordering::SeqCst);
            SendError::Closed
        })
    }

    fn is_closed(&self) -> bool {
        !self.open.load(Ordering::SeqCst)
    }
}

/// Receive half of a WebSocket connection.
pub struct WebSocketReceiver {
    stream: SplitStream<WebSocketStream<TcpStream>>,
    open: Arc<AtomicBool>,
    ended: bool,
}

impl WebSocketReceiver {
    fn end(&mut self) -> Inbound {
        self.ended = true;
        self.open.store(false, Ordering::SeqCst);
        Inbound::Closed
    }
}

#[async_trait]
impl Receiver for WebSocketReceiver {
    async fn recv(&mut self) -> Inbound {
        if self.ended {
            return Inbound::Closed;
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Inbound::Message(Payload::Text(text)),
                Some(Ok(Message::Binary(data))) => {
                    return Inbound::Message(Payload::Binary(Bytes::from(data)))
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    // Pings are answered by tungstenite itself.
                }
                Some(Ok(Message::Close(_))) => {
                    debug!("Received close frame");
                    return self.end();
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    debug!("WebSocket stream ended");
                    return self.end();
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    self.ended = true;
                    self.open.store(false, Ordering::SeqCst);
                    return Inbound::Error(e.to_string());
                }
            }
        }
    }
}
