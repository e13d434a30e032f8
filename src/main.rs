//! Multi-channel WebSocket Chatroom - Entry Point
//!
//! Loads configuration, starts the ChatServer actor with its default
//! channels, and accepts connections.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatroom::{serve, ChatConfig, ChatServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chatroom=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatroom=info")),
        )
        .init();

    let mut config = ChatConfig::from_env()?;

    // Bind address from command line overrides the environment
    if let Some(addr) = env::args().nth(1) {
        config.addr = addr;
    }

    // Start TCP listener
    let listener = TcpListener::bind(&config.addr).await?;
    info!("Chatroom listening on {}", config.addr);

    let chat = ChatServer::start(&config).await?;
    info!(
        "ChatServer actor started (max {} sessions, channels: {})",
        config.max_sessions,
        config.default_channels.join(", ")
    );

    serve(listener, chat, Arc::new(config)).await;

    Ok(())
}
