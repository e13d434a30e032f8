//! Chatroom state
//!
//! Composes the session registry and the channel store and owns the
//! broadcast algorithm. A `Chatroom` is plain single-owner state; the
//! `ChatServer` actor is what makes it the one consistency boundary shared
//! by every connection.

use tracing::{debug, info, warn};

use crate::channel::{ChannelStore, Message};
use crate::config::ChatConfig;
use crate::connection::Connection;
use crate::error::ChatError;
use crate::message::OutboundEvent;
use crate::registry::SessionRegistry;
use crate::types::SessionId;

/// Outcome of a successful broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Target channel's log length after the append
    pub log_len: usize,
    /// One delivery attempt per connected session, sender included
    pub attempted: usize,
    /// Recipients whose delivery failed; their connections were torn down
    pub failed: Vec<SessionId>,
}

impl BroadcastReport {
    pub fn delivered(&self) -> usize {
        self.attempted - self.failed.len()
    }
}

/// All sessions and channels of the room
#[derive(Debug)]
pub struct Chatroom {
    sessions: SessionRegistry,
    channels: ChannelStore,
}

impl Chatroom {
    /// Create an empty room with unbounded channel logs
    pub fn new(max_sessions: usize, max_channels: usize) -> Self {
        Self {
            sessions: SessionRegistry::new(max_sessions),
            channels: ChannelStore::new(max_channels, None),
        }
    }

    /// Create an empty room using the configured bounds
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            sessions: SessionRegistry::new(config.max_sessions),
            channels: ChannelStore::new(config.max_channels, config.history_limit),
        }
    }

    pub fn is_registered(&self, id: &SessionId) -> bool {
        self.sessions.is_registered(id)
    }

    /// Register a session ahead of its connection
    pub fn register(&mut self, id: SessionId, display_name: String) -> Result<(), ChatError> {
        let result = self.sessions.register(id.clone(), display_name.clone());
        match &result {
            Ok(()) => info!("Session {} registered as '{}'", id, display_name),
            Err(e) => debug!("Registration of {} rejected: {}", id, e),
        }
        result
    }

    /// Attach a session's live connection and greet it
    ///
    /// If the greeting cannot be queued the session is torn down at once and
    /// `DeliveryFailed` is returned.
    pub fn connect(&mut self, id: &SessionId, conn: Connection) -> Result<(), ChatError> {
        self.sessions.connect(id, conn)?;

        let Some(session) = self.sessions.get(id) else {
            return Err(ChatError::NotRegistered);
        };
        info!("Session {} ('{}') connected", id, session.display_name);

        let greeting = OutboundEvent::Connected {
            session_id: id.to_string(),
            display_name: session.display_name.clone(),
            channels: self.channels.names(),
        };
        let greeted = session.connection().map(|conn| conn.deliver(greeting));
        if let Some(Err(e)) = greeted {
            warn!("Failed to greet session {}: {}", id, e);
            self.disconnect(id);
            return Err(ChatError::DeliveryFailed(id.clone()));
        }

        debug!(
            "Registered sessions: {}, connected: {}",
            self.sessions.len(),
            self.sessions.connected_count()
        );
        Ok(())
    }

    /// Tear down a session's connection (idempotent)
    pub fn disconnect(&mut self, id: &SessionId) {
        if self.sessions.disconnect(id) {
            info!("Session {} disconnected", id);
        }
    }

    /// Create a channel
    pub fn add_channel(&mut self, name: &str) -> Result<(), ChatError> {
        self.channels.add(name)?;
        info!("Channel '{}' created", name);
        Ok(())
    }

    /// Append a message to a channel and broadcast it room-wide
    ///
    /// Every connected session receives the event, whatever channel it was
    /// sent to. Events are only queued here; the network write happens in
    /// each recipient's write task. A recipient that cannot take the event
    /// is disconnected and listed in the report without failing the call.
    pub fn receive_message(
        &mut self,
        id: &SessionId,
        channel: &str,
        body: String,
    ) -> Result<BroadcastReport, ChatError> {
        let session = self.sessions.get(id).ok_or(ChatError::NotRegistered)?;
        if !session.is_connected() {
            return Err(ChatError::NotConnected);
        }
        if !self.channels.contains(channel) {
            return Err(ChatError::ChannelNotFound(channel.to_string()));
        }

        let sender = session.display_name.clone();
        let log_len = self
            .channels
            .append(channel, Message::new(sender.clone(), body.clone()))?;

        let event = OutboundEvent::Message {
            channel: channel.to_string(),
            sender,
            content: body,
        };

        let mut attempted = 0;
        let mut failed = Vec::new();
        for (recipient, conn) in self.sessions.connected() {
            attempted += 1;
            if let Err(e) = conn.deliver(event.clone()) {
                warn!("{}: {}", ChatError::DeliveryFailed(recipient.clone()), e);
                failed.push(recipient.clone());
            }
        }

        for recipient in &failed {
            self.disconnect(recipient);
        }

        debug!(
            "Session {} posted to '{}' ({} recipients, {} failed)",
            id,
            channel,
            attempted,
            failed.len()
        );

        Ok(BroadcastReport {
            log_len,
            attempted,
            failed,
        })
    }

    /// Send an error event to one session's own connection
    pub fn notify_error(&mut self, id: &SessionId, err: &ChatError) {
        let Some(conn) = self.sessions.get(id).and_then(|s| s.connection()) else {
            return;
        };
        let result = conn.deliver(err.into());
        if let Err(e) = result {
            warn!("{}: {}", ChatError::DeliveryFailed(id.clone()), e);
            self.disconnect(id);
        }
    }

    /// Snapshot of a channel's log
    pub fn channel_log(&self, name: &str) -> Option<Vec<Message>> {
        self.channels
            .get(name)
            .map(|channel| channel.messages().cloned().collect())
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.names()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn connected_count(&self) -> usize {
        self.sessions.connected_count()
    }
}
