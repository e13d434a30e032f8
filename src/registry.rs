//! Session registry
//!
//! Maps session IDs to display names and connection state. Registration is
//! one-time per ID and bounded by `max_sessions`; a session gets exactly one
//! connection over its lifetime.

use std::collections::HashMap;

use crate::connection::Connection;
use crate::error::ChatError;
use crate::types::SessionId;

/// Connection state of a registered session
#[derive(Debug)]
pub enum SessionState {
    /// Registered, waiting for its connection
    Registered,
    /// Owns a live connection
    Connected(Connection),
    /// Connection was torn down; the entry stays until process exit
    Disconnected,
}

/// A registered participant
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub display_name: String,
    pub state: SessionState,
}

impl Session {
    fn new(id: SessionId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            state: SessionState::Registered,
        }
    }

    /// The live connection, if attached
    pub fn connection(&self) -> Option<&Connection> {
        match &self.state {
            SessionState::Connected(conn) => Some(conn),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }
}

/// Registry of all sessions
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_sessions,
        }
    }

    /// True iff the ID has an entry, whatever its connection state
    pub fn is_registered(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Register a new session without a connection
    pub fn register(&mut self, id: SessionId, display_name: String) -> Result<(), ChatError> {
        if self.sessions.contains_key(&id) {
            return Err(ChatError::AlreadyRegistered);
        }
        if self.sessions.len() >= self.max_sessions {
            return Err(ChatError::RoomFull);
        }

        self.sessions
            .insert(id.clone(), Session::new(id, display_name));
        Ok(())
    }

    /// Attach the session's one live connection
    ///
    /// A disconnected session has used its connection and is rejected as
    /// `AlreadyConnected`. Live connections are capped at `max_sessions`;
    /// since `register` already caps the registry at that size and the
    /// session being attached is not yet counted, this cap never trips while
    /// calls are serialized through the ChatServer.
    pub fn connect(&mut self, id: &SessionId, conn: Connection) -> Result<(), ChatError> {
        let connected = self.connected_count();
        let max_sessions = self.max_sessions;

        let session = self.sessions.get_mut(id).ok_or(ChatError::NotRegistered)?;
        if !matches!(session.state, SessionState::Registered) {
            return Err(ChatError::AlreadyConnected);
        }
        if connected >= max_sessions {
            return Err(ChatError::RoomFull);
        }

        session.state = SessionState::Connected(conn);
        Ok(())
    }

    /// Drop the session's connection, if any
    ///
    /// Returns true if a live connection was torn down. The entry itself is
    /// kept.
    pub fn disconnect(&mut self, id: &SessionId) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };

        match session.state {
            SessionState::Connected(_) => {
                // Dropping the handle closes the write task
                session.state = SessionState::Disconnected;
                true
            }
            SessionState::Registered | SessionState::Disconnected => false,
        }
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// All sessions currently holding a live connection
    pub fn connected(&self) -> impl Iterator<Item = (&SessionId, &Connection)> {
        self.sessions
            .iter()
            .filter_map(|(id, session)| session.connection().map(|conn| (id, conn)))
    }

    pub fn connected_count(&self) -> usize {
        self.connected().count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
