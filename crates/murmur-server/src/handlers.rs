//! Connection handlers for the Murmur server.
//!
//! This module runs the accept loop and drives each connection's inbound
//! stream through the relay engine.

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::{Context, Result};
use murmur_core::RelayEngine;
use murmur_transport::{
    Accepted, Handshake, Inbound, Transport, WebSocketConfig, WebSocketTransport,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared server state.
pub struct AppState {
    /// The relay engine.
    pub engine: RelayEngine,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            engine: RelayEngine::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the WebSocket relay server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new());

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let addr = config.bind_addr()?;
    let transport = WebSocketTransport::new(WebSocketConfig {
        bind_addr: addr,
        outbound_buffer: config.transport.outbound_buffer,
    })
    .await
    .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Murmur relay listening on ws://{}/", addr);

    accept_loop(transport, state).await;
    Ok(())
}

/// Accept connections forever, handing each to its own task.
///
/// The handshake runs on the spawned task, so a peer that stalls mid-upgrade
/// never holds up the next accept.
async fn accept_loop(transport: impl Transport, state: Arc<AppState>) {
    loop {
        match transport.accept().await {
            Ok(pending) => {
                tokio::spawn(handle_connection(pending, state.clone()));
            }
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                metrics::record_error("accept");
            }
        }
    }
}

/// Serve one connection until its transport reports it closed.
async fn handle_connection(pending: Box<dyn Handshake>, state: Arc<AppState>) {
    let accepted = match pending.complete().await {
        Ok(accepted) => accepted,
        Err(e) => {
            debug!(error = %e, "Handshake failed");
            metrics::record_error("handshake");
            return;
        }
    };

    let _metrics_guard = ConnectionMetricsGuard::new();
    let Accepted {
        connection,
        mut receiver,
        remote_addr,
    } = accepted;

    info!(
        connection = %connection.id(),
        remote = remote_addr.as_deref().unwrap_or("unknown"),
        "New connection"
    );

    loop {
        match receiver.recv().await {
            Inbound::Message(payload) => {
                metrics::record_message(payload.len(), payload.kind());
                let outcome = state.engine.handle(&connection, payload).await;
                metrics::record_outcome(&outcome);
                metrics::set_active_rooms(state.engine.stats().room_count);
            }
            Inbound::Error(e) => {
                warn!(connection = %connection.id(), error = %e, "Connection closed with exception");
                metrics::record_error("websocket");
            }
            Inbound::Closed => {
                debug!(connection = %connection.id(), "Transport reported close");
                break;
            }
        }
    }

    state.engine.disconnect(&connection).await;
    metrics::set_active_rooms(state.engine.stats().room_count);
}
