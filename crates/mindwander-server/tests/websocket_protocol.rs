//! End-to-end tests of the real-time protocol using a real WebSocket client.

use futures::{SinkExt, StreamExt};
use mindwander_server::{config::Config, routes, state::AppState};
use mindwander_types::{StateSnapshot, WsClientMessage, WsServerMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);
const GRACE_MS: u64 = 300;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Boot a server on an ephemeral port and return its WebSocket URL.
async fn boot_server() -> String {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_secret: "letmein".to_string(),
        classification_grace_ms: GRACE_MS,
        ..Config::default()
    };
    let state = Arc::new(AppState::new(config));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("ws://{addr}/ws")
}

/// Connect and consume the initial snapshot.
async fn connect(url: &str) -> (WsStream, StateSnapshot) {
    let (mut ws, _) = connect_async(url).await.unwrap();
    match next_message(&mut ws).await {
        WsServerMessage::StateUpdate(snapshot) => (ws, snapshot),
        other => panic!("Expected initial state:update, got {:?}", other),
    }
}

async fn send(ws: &mut WsStream, msg: &WsClientMessage) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

async fn next_message(ws: &mut WsStream) -> WsServerMessage {
    loop {
        let frame = timeout(TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for a message")
            .expect("Stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Read messages until one matches, returning it.
async fn recv_until(ws: &mut WsStream, pred: impl Fn(&WsServerMessage) -> bool) -> WsServerMessage {
    loop {
        let msg = next_message(ws).await;
        if pred(&msg) {
            return msg;
        }
    }
}

async fn recv_state(ws: &mut WsStream, pred: impl Fn(&StateSnapshot) -> bool) -> StateSnapshot {
    match recv_until(ws, |m| matches!(m, WsServerMessage::StateUpdate(s) if pred(s))).await {
        WsServerMessage::StateUpdate(snapshot) => snapshot,
        _ => unreachable!(),
    }
}

async fn authenticate(ws: &mut WsStream, secret: &str) -> bool {
    send(
        ws,
        &WsClientMessage::Authenticate {
            secret: secret.to_string(),
        },
    )
    .await;
    match recv_until(ws, |m| matches!(m, WsServerMessage::AuthenticateReply { .. })).await {
        WsServerMessage::AuthenticateReply { ok } => ok,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_connect_receives_snapshot() {
    let url = boot_server().await;
    let (_ws, snapshot) = connect(&url).await;
    assert_eq!(snapshot, StateSnapshot::default());
}

#[tokio::test]
async fn test_unauthenticated_connection_becomes_participant() {
    let url = boot_server().await;
    let (mut admin, _) = connect(&url).await;
    assert!(authenticate(&mut admin, "letmein").await);

    let (_participant, _) = connect(&url).await;
    let snapshot = recv_state(&mut admin, |s| s.participant_count == 1).await;
    assert_eq!(snapshot.participant_count, 1);
}

#[tokio::test]
async fn test_wrong_secret_counts_participant_immediately() {
    let url = boot_server().await;
    let (mut ws, _) = connect(&url).await;

    send(
        &mut ws,
        &WsClientMessage::Authenticate {
            secret: "wrong".to_string(),
        },
    )
    .await;

    // The reply and the broadcast may arrive in either order.
    let mut reply = None;
    let mut counted = false;
    while reply.is_none() || !counted {
        match next_message(&mut ws).await {
            WsServerMessage::AuthenticateReply { ok } => reply = Some(ok),
            WsServerMessage::StateUpdate(s) if s.participant_count == 1 => counted = true,
            _ => {}
        }
    }
    assert_eq!(reply, Some(false));
}

#[tokio::test]
async fn test_session_lifecycle_over_websocket() {
    let url = boot_server().await;
    let (mut admin, _) = connect(&url).await;
    assert!(authenticate(&mut admin, "letmein").await);
    let (mut participant, _) = connect(&url).await;

    // Stopped: ignored without a broadcast.
    send(&mut participant, &WsClientMessage::Increment).await;

    send(&mut admin, &WsClientMessage::Start).await;
    recv_state(&mut participant, |s| s.running).await;

    send(&mut participant, &WsClientMessage::Increment).await;
    send(&mut participant, &WsClientMessage::Increment).await;
    let snapshot = recv_state(&mut admin, |s| s.count == 2).await;
    assert!(snapshot.running);

    send(&mut admin, &WsClientMessage::Stop).await;
    let stopped = recv_state(&mut participant, |s| !s.running).await;
    assert_eq!(stopped.count, 2);

    send(&mut admin, &WsClientMessage::Reset).await;
    let reset = recv_state(&mut participant, |s| s.count == 0).await;
    assert!(!reset.running);
    assert_eq!(reset.elapsed, 0);
}

#[tokio::test]
async fn test_admin_ops_rejected_for_non_admin() {
    let url = boot_server().await;
    let (mut ws, _) = connect(&url).await;

    send(&mut ws, &WsClientMessage::Start).await;
    match recv_until(&mut ws, |m| matches!(m, WsServerMessage::Error { .. })).await {
        WsServerMessage::Error { code, .. } => assert_eq!(code, "not_admin"),
        _ => unreachable!(),
    }

    // The connection stays usable after a rejection.
    send(&mut ws, &WsClientMessage::Ping { timestamp: 7 }).await;
    let pong = recv_until(&mut ws, |m| matches!(m, WsServerMessage::Pong { .. })).await;
    assert_eq!(pong, WsServerMessage::Pong { timestamp: 7 });
}

#[tokio::test]
async fn test_invalid_message_reports_error() {
    let url = boot_server().await;
    let (mut ws, _) = connect(&url).await;

    ws.send(Message::Text(r#"{"type":"admin:explode"}"#.into()))
        .await
        .unwrap();
    match recv_until(&mut ws, |m| matches!(m, WsServerMessage::Error { .. })).await {
        WsServerMessage::Error { code, .. } => assert_eq!(code, "invalid_message"),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_participant_disconnect_is_broadcast() {
    let url = boot_server().await;
    let (mut admin, _) = connect(&url).await;
    assert!(authenticate(&mut admin, "letmein").await);

    let (mut participant, _) = connect(&url).await;
    assert!(!authenticate(&mut participant, "nope").await);
    recv_state(&mut admin, |s| s.participant_count == 1).await;

    participant.close(None).await.unwrap();
    drop(participant);
    recv_state(&mut admin, |s| s.participant_count == 0).await;
}
