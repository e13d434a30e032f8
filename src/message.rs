//! Event protocol definitions
//!
//! JSON-based bidirectional event protocol using Serde's tagged enum
//! for type-safe serialization/deserialization.

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Client → Server event
///
/// The sender is never part of the payload; it is derived from the session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Post a message into a channel
    Message { channel: String, content: String },
}

/// Server → Client event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Connection attached, sent once to the new session
    Connected {
        session_id: String,
        display_name: String,
        channels: Vec<String>,
    },
    /// Chat message broadcast to every connected session
    Message {
        channel: String,
        sender: String,
        content: String,
    },
    /// The session's own request was rejected
    Error { code: ErrorCode, message: String },
}

/// Error codes for OutboundEvent::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AlreadyRegistered,
    RoomFull,
    NotRegistered,
    AlreadyConnected,
    NotConnected,
    ChannelNotFound,
    ChannelExists,
    TooManyChannels,
    /// Anything the client cannot act on
    Internal,
}

/// Convert ChatError to OutboundEvent for client notification
impl From<&ChatError> for OutboundEvent {
    fn from(err: &ChatError) -> Self {
        let code = match err {
            ChatError::AlreadyRegistered => ErrorCode::AlreadyRegistered,
            ChatError::RoomFull => ErrorCode::RoomFull,
            ChatError::NotRegistered => ErrorCode::NotRegistered,
            ChatError::AlreadyConnected => ErrorCode::AlreadyConnected,
            ChatError::NotConnected => ErrorCode::NotConnected,
            ChatError::ChannelNotFound(_) => ErrorCode::ChannelNotFound,
            ChatError::ChannelExists(_) => ErrorCode::ChannelExists,
            ChatError::TooManyChannels => ErrorCode::TooManyChannels,
            ChatError::DeliveryFailed(_) | ChatError::ServerClosed => ErrorCode::Internal,
        };
        OutboundEvent::Error {
            code,
            message: err.to_string(),
        }
    }
}
