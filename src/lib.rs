//! Multi-channel WebSocket Chatroom Library
//!
//! A small real-time chatroom built with tokio-tungstenite using the Actor
//! pattern for state management.
//!
//! # Features
//! - Session registration with a bounded room size
//! - One WebSocket connection per registered session
//! - Named channels created at startup
//! - Room-wide broadcast of every message, sender included
//! - Per-recipient failure isolation with automatic disconnect
//!
//! # Architecture
//! - `Chatroom` owns the session registry and the channel store
//! - `ChatServer` is the actor that owns the `Chatroom`; its command queue is
//!   the single critical section every connection goes through
//! - Each connection has a read task and a write task; the chatroom only
//!   queues outbound events, the write task performs the network write
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use chatroom::{serve, ChatConfig, ChatServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(ChatConfig::default());
//!     let listener = TcpListener::bind(&config.addr).await.unwrap();
//!     let chat = ChatServer::start(&config).await.unwrap();
//!
//!     serve(listener, chat, config).await;
//! }
//! ```

pub mod channel;
pub mod chatroom;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use channel::{Channel, ChannelStore, Message};
pub use chatroom::{BroadcastReport, Chatroom};
pub use config::{ChatConfig, ConfigError};
pub use connection::Connection;
pub use error::{AppError, ChatError, SendError};
pub use handler::{handle_connection, serve, HandshakeParams};
pub use message::{ErrorCode, InboundEvent, OutboundEvent};
pub use registry::{Session, SessionRegistry, SessionState};
pub use server::{ChatHandle, ChatServer, ServerCommand};
pub use types::SessionId;
