//! Error types for the chatroom
//!
//! Defines the chatroom's own error taxonomy, transport-level errors,
//! and outbound queue send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::SessionId;

/// Chatroom errors
///
/// Every registry or channel lookup/mutation failure is reported to the
/// caller with one of these. `DeliveryFailed` only ever shows up in logs and
/// broadcast reports, never as the result of a send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Session ID already has a registry entry
    #[error("Session already registered")]
    AlreadyRegistered,

    /// Registry (or live connection count) is at capacity
    #[error("The chatroom is full")]
    RoomFull,

    /// Session ID has no registry entry
    #[error("Session not registered")]
    NotRegistered,

    /// Session already owns (or already used) its connection
    #[error("Session already connected")]
    AlreadyConnected,

    /// Session has no live connection
    #[error("Session not connected")]
    NotConnected,

    /// No channel with the given name
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// A channel with the given name already exists
    #[error("A channel with that name already exists: {0}")]
    ChannelExists(String),

    /// Channel count is at capacity
    #[error("Maximum number of channels reached")]
    TooManyChannels,

    /// Outbound event could not be queued for one recipient
    #[error("Delivery to session {0} failed")]
    DeliveryFailed(SessionId),

    /// The chat server actor has stopped
    #[error("Chat server is not running")]
    ServerClosed,
}

/// Application-level (transport) errors
///
/// Fatal for the connection they occur on.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Chatroom rejected the session during the handshake
    #[error("Chatroom error: {0}")]
    Chat(#[from] ChatError),
}

/// Outbound queue send errors
///
/// Occurs when an event cannot be queued on a connection handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The write task has ended and dropped its receiver
    #[error("Channel closed")]
    ChannelClosed,

    /// The peer is not draining its queue
    #[error("Outbound queue full")]
    QueueFull,
}
