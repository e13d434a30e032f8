//! WebSocket connection handler
//!
//! The transport adapter: performs the WebSocket handshake, registers and
//! connects the session with the ChatServer, and pumps frames between the
//! socket and the chatroom.

use std::sync::Arc;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::config::ChatConfig;
use crate::connection::Connection;
use crate::error::{AppError, ChatError};
use crate::message::{InboundEvent, OutboundEvent};
use crate::server::ChatHandle;
use crate::types::SessionId;

/// Cookie and query parameter carrying the session ID
pub const SESSION_PARAM: &str = "session_id";

/// Query parameter carrying the display name to register with
pub const DISPLAY_NAME_PARAM: &str = "display_name";

/// Session details extracted from the upgrade request
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HandshakeParams {
    pub session_id: Option<SessionId>,
    pub display_name: Option<String>,
}

impl HandshakeParams {
    /// Extract from an upgrade request's query string and cookie header
    ///
    /// The query parameter wins over the cookie. Values are taken verbatim
    /// after form decoding; only empty values are skipped.
    pub fn parse(query: Option<&str>, cookie: Option<&str>) -> Self {
        let mut params = Self::default();

        let pairs = query
            .into_iter()
            .flat_map(|q| q.split('&'))
            .filter_map(|pair| pair.split_once('='));
        for (key, value) in pairs {
            // Form encoding writes spaces as '+'
            let value = value.replace('+', " ");
            let Ok(value) = urlencoding::decode(&value) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let value: &str = &value;
            match key {
                SESSION_PARAM => params.session_id = Some(SessionId::from(value)),
                DISPLAY_NAME_PARAM => params.display_name = Some(value.to_string()),
                _ => {}
            }
        }

        if params.session_id.is_none() {
            params.session_id = cookie
                .into_iter()
                .flat_map(|c| c.split(';'))
                .filter_map(|pair| pair.trim_start().split_once('='))
                .find(|(key, value)| *key == SESSION_PARAM && !value.is_empty())
                .map(|(_, value)| SessionId::from(value));
        }

        params
    }

    fn from_request(request: &Request) -> Self {
        let cookie = request
            .headers()
            .get("cookie")
            .and_then(|value| value.to_str().ok());
        Self::parse(request.uri().query(), cookie)
    }
}

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, attaches the session to the chatroom,
/// and manages the connection lifecycle. Whichever side ends first, the
/// session is disconnected afterwards.
pub async fn handle_connection(
    stream: TcpStream,
    chat: ChatHandle,
    config: Arc<ChatConfig>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let mut params = HandshakeParams::default();
    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            params = HandshakeParams::from_request(request);
            Ok(response)
        },
    )
    .await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Issue an ID when the client brought none
    let session_id = params.session_id.unwrap_or_else(SessionId::generate);

    // Create channel for server -> client events
    let (connection, mut msg_rx) = Connection::channel(config.outbound_buffer);

    if let Err(e) = attach(&chat, &session_id, params.display_name, connection).await {
        warn!("Session {} from {} rejected: {}", session_id, peer_addr, e);
        let json = serde_json::to_string(&OutboundEvent::from(&e))?;
        let _ = ws_sender.send(Message::Text(json.into())).await;
        let _ = ws_sender.close().await;
        return Err(e.into());
    }

    info!("Session {} connected from {}", session_id, peer_addr);

    // Spawn read task (WebSocket -> ServerCommand)
    let chat_read = chat.clone();
    let read_id = session_id.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match serde_json::from_str::<InboundEvent>(&text) {
                    Ok(InboundEvent::Message { channel, content }) => {
                        match chat_read
                            .receive_message(read_id.clone(), channel, content)
                            .await
                        {
                            Ok(_) => {}
                            Err(ChatError::ServerClosed) => {
                                debug!("Server closed, ending read task for {}", read_id);
                                break;
                            }
                            // The server already told the client
                            Err(e) => debug!("Message from {} rejected: {}", read_id, e),
                        }
                    }
                    Err(e) => {
                        warn!("Invalid JSON from {}: {}", read_id, e);
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Session {} sent close frame", read_id);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", read_id);
                }
                Ok(_) => {
                    // Binary, pong and raw frames - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", read_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", read_id);
    });

    // Spawn write task (OutboundEvent -> WebSocket)
    let write_timeout = config.write_timeout;
    let write_id = session_id.clone();
    let mut write_task = tokio::spawn(async move {
        write_events(&mut msg_rx, &mut ws_sender, write_timeout, &write_id).await;
        debug!("Write task ended for {}", write_id);

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete, then stop the other
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", session_id);
            write_task.abort();
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", session_id);
            read_task.abort();
        }
    }

    chat.disconnect(session_id.clone()).await;

    info!("Session {} disconnected", session_id);

    Ok(())
}

/// Accept connections until the listener fails permanently
///
/// Spawns one handler task per connection, all sharing the same ChatServer.
pub async fn serve(listener: TcpListener, chat: ChatHandle, config: Arc<ChatConfig>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let chat = chat.clone();
                let config = Arc::clone(&config);

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, chat, config).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Register (when a display name was given) and connect the session
async fn attach(
    chat: &ChatHandle,
    session_id: &SessionId,
    display_name: Option<String>,
    connection: Connection,
) -> Result<(), ChatError> {
    if let Some(display_name) = display_name {
        chat.register(session_id.clone(), display_name).await?;
    }
    chat.connect(session_id.clone(), connection).await
}

/// Drain the outbound queue into the socket until it closes or a write fails
///
/// Each frame write is bounded by `write_timeout` so a stalled peer ends its
/// own connection instead of holding events forever.
async fn write_events<S>(
    msg_rx: &mut mpsc::Receiver<OutboundEvent>,
    ws_sender: &mut S,
    write_timeout: std::time::Duration,
    session_id: &SessionId,
) where
    S: Sink<Message> + Unpin,
{
    while let Some(event) = msg_rx.recv().await {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                // Continue - don't break on serialization errors
                error!("Failed to serialize event: {}", e);
                continue;
            }
        };
        match timeout(write_timeout, ws_sender.send(Message::Text(json.into()))).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                debug!("WebSocket send failed for {}, ending write task", session_id);
                break;
            }
            Err(_) => {
                warn!("Write to {} timed out after {:?}", session_id, write_timeout);
                break;
            }
        }
    }
}
