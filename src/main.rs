//! # Realtime Server
//!
//! Presence, multi-device sessions, story fan-out and call signaling over
//! WebSocket.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool
//! - Redis store and delivery bus
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use realtime_server::config::Settings;
use realtime_server::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    realtime_server::telemetry::init_tracing();

    info!("Starting Realtime Server...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        delivery_channel = %settings.redis.delivery_channel,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
