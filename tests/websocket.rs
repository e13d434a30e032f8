//! WebSocket round trips against a live listener

use std::sync::Arc;
use std::time::Duration;

use chatroom::{serve, ChatConfig, ChatHandle, ChatServer};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(config: ChatConfig) -> (String, ChatHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let chat = ChatServer::start(&config).await.unwrap();
    tokio::spawn(serve(listener, chat.clone(), Arc::new(config)));
    (format!("ws://{}/ws", addr), chat)
}

async fn open(base: &str, query: &str) -> Client {
    let (ws, _) = connect_async(format!("{}?{}", base, query)).await.unwrap();
    ws
}

/// Next text frame as JSON, or None once the server closes
async fn next_json(ws: &mut Client) -> Option<Value> {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame");
        match frame {
            Some(Ok(Message::Text(text))) => return Some(serde_json::from_str(&text).unwrap()),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

#[tokio::test]
async fn test_broadcast_over_websocket() {
    let config = ChatConfig {
        max_sessions: 2,
        default_channels: vec!["main".to_string()],
        ..ChatConfig::default()
    };
    let (base, chat) = start_server(config).await;

    let mut alice = open(&base, "session_id=s1&display_name=Alice").await;
    let greeting = next_json(&mut alice).await.unwrap();
    assert_eq!(greeting["event"], "connected");
    assert_eq!(greeting["session_id"], "s1");
    assert_eq!(greeting["channels"], json!(["main"]));

    let mut bob = open(&base, "session_id=s2&display_name=Bob").await;
    assert_eq!(next_json(&mut bob).await.unwrap()["event"], "connected");

    let mut eve = open(&base, "session_id=s3&display_name=Eve").await;
    let rejection = next_json(&mut eve).await.unwrap();
    assert_eq!(rejection["event"], "error");
    assert_eq!(rejection["code"], "room_full");
    assert!(next_json(&mut eve).await.is_none());

    send_json(
        &mut alice,
        json!({"event": "message", "channel": "main", "content": "hi"}),
    )
    .await;

    let expected = json!({"event": "message", "channel": "main", "sender": "Alice", "content": "hi"});
    assert_eq!(next_json(&mut alice).await.unwrap(), expected);
    assert_eq!(next_json(&mut bob).await.unwrap(), expected);

    send_json(
        &mut alice,
        json!({"event": "message", "channel": "missing", "content": "hi"}),
    )
    .await;
    let error = next_json(&mut alice).await.unwrap();
    assert_eq!(error["code"], "channel_not_found");

    assert_eq!(chat.channel_log("main").await.unwrap().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unregistered_session_rejected() {
    let (base, _chat) = start_server(ChatConfig::default()).await;

    let mut ws = open(&base, "session_id=nobody").await;

    let rejection = next_json(&mut ws).await.unwrap();
    assert_eq!(rejection["code"], "not_registered");
    assert!(next_json(&mut ws).await.is_none());
}

#[tokio::test]
async fn test_issued_session_id_when_absent() {
    let (base, chat) = start_server(ChatConfig::default()).await;

    let mut ws = open(&base, "display_name=Anon").await;

    let greeting = next_json(&mut ws).await.unwrap();
    let issued = greeting["session_id"].as_str().unwrap().to_string();
    assert!(!issued.is_empty());
    assert!(chat.is_registered(&issued.into()).await.unwrap());
}

#[tokio::test]
async fn test_malformed_frame_is_skipped() {
    let config = ChatConfig {
        default_channels: vec!["main".to_string()],
        ..ChatConfig::default()
    };
    let (base, _chat) = start_server(config).await;
    let mut ws = open(&base, "session_id=s1&display_name=Alice").await;
    next_json(&mut ws).await.unwrap();

    ws.send(Message::Text("not json".to_string().into()))
        .await
        .unwrap();
    send_json(
        &mut ws,
        json!({"event": "message", "channel": "main", "content": "still here"}),
    )
    .await;

    let event = next_json(&mut ws).await.unwrap();
    assert_eq!(event["content"], "still here");
}

#[tokio::test]
async fn test_closed_client_stops_receiving() {
    let config = ChatConfig {
        default_channels: vec!["main".to_string()],
        ..ChatConfig::default()
    };
    let (base, chat) = start_server(config).await;
    let mut alice = open(&base, "session_id=s1&display_name=Alice").await;
    next_json(&mut alice).await.unwrap();
    let mut bob = open(&base, "session_id=s2&display_name=Bob").await;
    next_json(&mut bob).await.unwrap();

    bob.close(None).await.unwrap();

    // Wait until the server has processed bob's disconnect
    let mut attempted = usize::MAX;
    for _ in 0..50 {
        let report = chat
            .receive_message("s1".into(), "main".to_string(), "ping".to_string())
            .await
            .unwrap();
        next_json(&mut alice).await.unwrap();
        attempted = report.attempted;
        if attempted == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(attempted, 1);
}

#[tokio::test]
async fn test_stalled_reader_disconnected_by_write_timeout() {
    let config = ChatConfig {
        default_channels: vec!["main".to_string()],
        // Large enough that the queue never fills within this test
        outbound_buffer: 1024,
        write_timeout: Duration::from_millis(200),
        ..ChatConfig::default()
    };
    let (base, chat) = start_server(config).await;

    // Sender lives in-process and drains its own queue
    chat.register("writer".into(), "Writer".to_string())
        .await
        .unwrap();
    let (conn, mut writer_rx) = chatroom::Connection::channel(1024);
    chat.connect("writer".into(), conn).await.unwrap();
    tokio::spawn(async move { while writer_rx.recv().await.is_some() {} });

    // Connects, then never reads again
    let mut idle = open(&base, "session_id=idle&display_name=Idle").await;
    next_json(&mut idle).await.unwrap();

    let payload = "x".repeat(256 * 1024);
    let mut attempted = usize::MAX;
    for _ in 0..400 {
        let report = chat
            .receive_message("writer".into(), "main".to_string(), payload.clone())
            .await
            .unwrap();
        assert!(report.failed.is_empty());
        attempted = report.attempted;
        if attempted == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(attempted, 1);
    assert!(chat.is_registered(&"idle".into()).await.unwrap());
    drop(idle);
}
