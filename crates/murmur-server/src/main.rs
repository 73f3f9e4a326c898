//! # Murmur Server
//!
//! Realtime room relay over WebSocket.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings (127.0.0.1:8765)
//! murmur
//!
//! # Run with environment variables
//! MURMUR_PORT=8080 MURMUR_HOST=0.0.0.0 murmur
//! ```
//!
//! The first of `./murmur.toml`, `/etc/murmur/murmur.toml` and
//! `~/.config/murmur/murmur.toml` that exists is loaded. Host and port left
//! unset fall back to `MURMUR_HOST` and `MURMUR_PORT`, then to `127.0.0.1:8765`.
//!
//! Clients talk plain text or binary frames; a text frame that starts with
//! U+200B is a control command (`join <room>`, `leave`, `where`, `random`,
//! `pass`, `binary on`) and every reply is prefixed the same way. Prometheus
//! metrics are served on a separate port when `[metrics] enabled = true`.

mod config;
mod handlers;
mod metrics;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur_server=debug,murmur_core=debug,murmur_transport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!("Starting Murmur relay on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
