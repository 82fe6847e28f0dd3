//! WebSocket connection handling.

use crate::state::AppState;
use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use mindwander_core::{AdminOp, ConnectionId, MindwanderError, SessionHandle};
use mindwander_types::{WsClientMessage, WsServerMessage};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Maximum size for a client message (4KB). Every valid message is tiny.
const MAX_MESSAGE_SIZE: usize = 4 * 1024;

type WsSink = SplitSink<WebSocket, Message>;

async fn send_message(ws_tx: &mut WsSink, msg: &WsServerMessage) -> Result<()> {
    let json = serde_json::to_string(msg)?;
    ws_tx.send(Message::Text(json.into())).await?;
    Ok(())
}

pub async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) -> Result<()> {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let connected = state.session.connect().await?;
    let id = connected.id;
    let mut updates = connected.updates;
    info!(target: "mindwander::ws", "WebSocket client connected: {}", id);

    // The current state goes to this client alone before any broadcast.
    if let Err(e) = send_message(&mut ws_tx, &WsServerMessage::StateUpdate(connected.snapshot)).await {
        debug!(target: "mindwander::ws", "Initial send failed for {}: {}", id, e);
        state.session.disconnect(id).await?;
        return Ok(());
    }

    // Replies addressed to this connection only.
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<WsServerMessage>(32);

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = outgoing_rx.recv() => {
                    if let Err(e) = send_message(&mut ws_tx, &msg).await {
                        debug!(target: "mindwander::ws", "WebSocket send failed for {}: {}", id, e);
                        break;
                    }
                }
                update = updates.recv() => {
                    match update {
                        Ok(snapshot) => {
                            if let Err(e) = send_message(&mut ws_tx, &WsServerMessage::StateUpdate(snapshot)).await {
                                debug!(target: "mindwander::ws", "WebSocket send failed for {} (client likely disconnected): {}", id, e);
                                break;
                            }
                        }
                        // Snapshots are complete; a slow client only needs the newer ones.
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(target: "mindwander::ws", "Client {} lagged, skipped {} updates", id, skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    });

    let session = state.session.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => {
                    let text = text.as_str();
                    if text.len() > MAX_MESSAGE_SIZE {
                        warn!(
                            target: "mindwander::ws",
                            "Message too large ({} bytes) from {}, max {} bytes",
                            text.len(),
                            id,
                            MAX_MESSAGE_SIZE
                        );
                        continue;
                    }
                    match serde_json::from_str::<WsClientMessage>(text) {
                        Ok(client_msg) => {
                            if let Err(e) = handle_client_message(&session, id, client_msg, &outgoing_tx).await {
                                warn!(target: "mindwander::ws", "Dropping connection {}: {}", id, e);
                                break;
                            }
                        }
                        Err(e) => {
                            debug!(target: "mindwander::ws", "Invalid message from {}: {}", id, e);
                            let _ = outgoing_tx
                                .send(WsServerMessage::Error {
                                    code: "invalid_message".to_string(),
                                    message: e.to_string(),
                                })
                                .await;
                        }
                    }
                }
                Message::Close(_) => {
                    debug!(target: "mindwander::ws", "Client {} closed connection", id);
                    break;
                }
                // Pings are answered by axum.
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    if let Err(e) = state.session.disconnect(id).await {
        debug!(target: "mindwander::ws", "Could not unregister {}: {}", id, e);
    }
    info!(target: "mindwander::ws", "WebSocket client disconnected: {}", id);
    Ok(())
}

/// Apply one client request. Only an unavailable session is an error here;
/// rejected requests are reported back to the client.
async fn handle_client_message(
    session: &SessionHandle,
    id: ConnectionId,
    msg: WsClientMessage,
    outgoing: &mpsc::Sender<WsServerMessage>,
) -> mindwander_core::Result<()> {
    debug!(target: "mindwander::ws", "{} from {}", msg.event_name(), id);

    let op = match msg {
        WsClientMessage::Increment => {
            session.increment(id).await?;
            return Ok(());
        }
        WsClientMessage::Authenticate { secret } => {
            let ok = session.authenticate(id, secret).await?;
            let _ = outgoing.send(WsServerMessage::AuthenticateReply { ok }).await;
            return Ok(());
        }
        WsClientMessage::Ping { timestamp } => {
            let _ = outgoing.send(WsServerMessage::Pong { timestamp }).await;
            tracing::trace!(target: "mindwander::ws::ping", "Sent pong to {} for timestamp: {}", id, timestamp);
            return Ok(());
        }
        WsClientMessage::Start => AdminOp::Start,
        WsClientMessage::Stop => AdminOp::Stop,
        WsClientMessage::Reset => AdminOp::Reset,
    };

    match session.admin(id, op).await {
        Ok(_) => Ok(()),
        Err(e @ MindwanderError::NotAdmin { .. }) => {
            let _ = outgoing
                .send(WsServerMessage::Error {
                    code: e.code().to_string(),
                    message: e.to_string(),
                })
                .await;
            Ok(())
        }
        Err(e) => Err(e),
    }
}
