//! Live connection handle
//!
//! The chatroom never touches a socket. A connection is the sending half of
//! the queue drained by the connection's write task; dropping the last
//! handle ends that task, which closes the WebSocket.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::OutboundEvent;

/// Handle to a live transport connection
#[derive(Debug)]
pub struct Connection {
    sender: mpsc::Sender<OutboundEvent>,
}

impl Connection {
    /// Wrap the sending half of a connection's outbound queue
    pub fn new(sender: mpsc::Sender<OutboundEvent>) -> Self {
        Self { sender }
    }

    /// Create a connection together with the receiver its write task drains
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }

    /// Queue an event for this connection without waiting
    ///
    /// Fails if the write task is gone or the peer has stopped draining
    /// its queue.
    pub fn deliver(&self, event: OutboundEvent) -> Result<(), SendError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Check whether the write task has dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
