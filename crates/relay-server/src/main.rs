//! # Relay Server
//!
//! HTTP message relay with direct and topic delivery over cursor-based polling.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings (sled database in ./relay.db)
//! relay
//!
//! # Volatile in-memory store
//! RELAY_STORAGE__PATH=:memory: relay
//!
//! # Override nested settings from the environment
//! RELAY_PORT=8080 RELAY_AUTH__JWT_SECRET=change-me relay
//! ```

mod auth;
mod config;
mod error;
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
                .unwrap_or_else(|_| "relay=debug,relay_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!("Starting relay server on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
