//! ChatServer Actor implementation
//!
//! The central actor that owns the `Chatroom`. Every operation from every
//! connection goes through its command queue, so the actor is the single
//! critical section over sessions and channels. `ChatHandle` wraps the
//! request/reply plumbing behind async methods.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::channel::Message;
use crate::chatroom::{BroadcastReport, Chatroom};
use crate::config::ChatConfig;
use crate::connection::Connection;
use crate::error::ChatError;
use crate::types::SessionId;

/// Channel buffer size for server commands
pub const CHANNEL_BUFFER_SIZE: usize = 256;

type Reply<T> = oneshot::Sender<Result<T, ChatError>>;

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Check whether a session ID is registered
    IsRegistered {
        session_id: SessionId,
        reply: oneshot::Sender<bool>,
    },
    /// Register a session ahead of its connection
    Register {
        session_id: SessionId,
        display_name: String,
        reply: Reply<()>,
    },
    /// Attach a session's live connection
    Connect {
        session_id: SessionId,
        connection: Connection,
        reply: Reply<()>,
    },
    /// Session's transport ended
    Disconnect { session_id: SessionId },
    /// Create a channel
    AddChannel { name: String, reply: Reply<()> },
    /// Post a message into a channel
    ReceiveMessage {
        session_id: SessionId,
        channel: String,
        content: String,
        reply: Reply<BroadcastReport>,
    },
    /// Read a channel's log
    ChannelLog {
        name: String,
        reply: oneshot::Sender<Option<Vec<Message>>>,
    },
}

/// The main ChatServer actor
pub struct ChatServer {
    room: Chatroom,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer over the given room
    pub fn new(room: Chatroom, receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self { room, receiver }
    }

    /// Spawn the actor on the current runtime and return a handle to it
    pub fn spawn(room: Chatroom, buffer: usize) -> ChatHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(buffer);
        tokio::spawn(ChatServer::new(room, cmd_rx).run());
        ChatHandle::new(cmd_tx)
    }

    /// Spawn the actor for a configured room and create its default channels
    pub async fn start(config: &ChatConfig) -> Result<ChatHandle, ChatError> {
        let handle = Self::spawn(Chatroom::from_config(config), CHANNEL_BUFFER_SIZE);
        for name in &config.default_channels {
            handle.add_channel(name).await?;
        }
        Ok(handle)
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    ///
    /// Replies are best effort: a caller that stopped waiting is not an error.
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::IsRegistered { session_id, reply } => {
                let _ = reply.send(self.room.is_registered(&session_id));
            }
            ServerCommand::Register {
                session_id,
                display_name,
                reply,
            } => {
                let _ = reply.send(self.room.register(session_id, display_name));
            }
            ServerCommand::Connect {
                session_id,
                connection,
                reply,
            } => {
                let _ = reply.send(self.room.connect(&session_id, connection));
            }
            ServerCommand::Disconnect { session_id } => {
                self.room.disconnect(&session_id);
            }
            ServerCommand::AddChannel { name, reply } => {
                let _ = reply.send(self.room.add_channel(&name));
            }
            ServerCommand::ReceiveMessage {
                session_id,
                channel,
                content,
                reply,
            } => {
                let result = self.room.receive_message(&session_id, &channel, content);
                if let Err(e) = &result {
                    debug!("Message from {} rejected: {}", session_id, e);
                    self.room.notify_error(&session_id, e);
                }
                let _ = reply.send(result);
            }
            ServerCommand::ChannelLog { name, reply } => {
                let _ = reply.send(self.room.channel_log(&name));
            }
        }
    }
}

/// Cloneable handle to the ChatServer actor
///
/// Every method fails with `ChatError::ServerClosed` once the actor is gone.
#[derive(Debug, Clone)]
pub struct ChatHandle {
    sender: mpsc::Sender<ServerCommand>,
}

impl ChatHandle {
    pub fn new(sender: mpsc::Sender<ServerCommand>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ServerCommand,
    ) -> Result<T, ChatError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| ChatError::ServerClosed)?;
        reply_rx.await.map_err(|_| ChatError::ServerClosed)
    }

    pub async fn is_registered(&self, session_id: &SessionId) -> Result<bool, ChatError> {
        let session_id = session_id.clone();
        self.request(|reply| ServerCommand::IsRegistered { session_id, reply })
            .await
    }

    pub async fn register(
        &self,
        session_id: SessionId,
        display_name: String,
    ) -> Result<(), ChatError> {
        self.request(|reply| ServerCommand::Register {
            session_id,
            display_name,
            reply,
        })
        .await?
    }

    pub async fn connect(
        &self,
        session_id: SessionId,
        connection: Connection,
    ) -> Result<(), ChatError> {
        self.request(|reply| ServerCommand::Connect {
            session_id,
            connection,
            reply,
        })
        .await?
    }

    /// Fire-and-forget: the transport is already gone
    pub async fn disconnect(&self, session_id: SessionId) {
        let _ = self
            .sender
            .send(ServerCommand::Disconnect { session_id })
            .await;
    }

    pub async fn add_channel(&self, name: &str) -> Result<(), ChatError> {
        let name = name.to_string();
        self.request(|reply| ServerCommand::AddChannel { name, reply })
            .await?
    }

    pub async fn receive_message(
        &self,
        session_id: SessionId,
        channel: String,
        content: String,
    ) -> Result<BroadcastReport, ChatError> {
        self.request(|reply| ServerCommand::ReceiveMessage {
            session_id,
            channel,
            content,
            reply,
        })
        .await?
    }

    pub async fn channel_log(&self, name: &str) -> Result<Option<Vec<Message>>, ChatError> {
        let name = name.to_string();
        self.request(|reply| ServerCommand::ChannelLog { name, reply })
            .await
    }
}
