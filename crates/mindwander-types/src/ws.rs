//! WebSocket message protocol between client and server.
//!
//! Every frame is a JSON object whose `type` field carries the event name,
//! e.g. `{"type":"count:increment"}` or
//! `{"type":"state:update","count":3,"running":true,"elapsed":1500,"userCount":2}`.

use serde::{Deserialize, Serialize};

use crate::StateSnapshot;

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsClientMessage {
    /// Record one distraction. Ignored while the session is stopped.
    #[serde(rename = "count:increment")]
    Increment,
    /// Attempt to authenticate this connection as admin.
    #[serde(rename = "admin:authenticate")]
    Authenticate { secret: String },
    /// Start the session clock (admin only).
    #[serde(rename = "admin:start")]
    Start,
    /// Stop the session clock (admin only).
    #[serde(rename = "admin:stop")]
    Stop,
    /// Zero the counter and the clock (admin only).
    #[serde(rename = "admin:reset")]
    Reset,
    /// Ping for keepalive.
    #[serde(rename = "ping")]
    Ping { timestamp: u64 },
}

impl WsClientMessage {
    /// Wire event name of this message.
    pub fn event_name(&self) -> &'static str {
        match self {
            WsClientMessage::Increment => "count:increment",
            WsClientMessage::Authenticate { .. } => "admin:authenticate",
            WsClientMessage::Start => "admin:start",
            WsClientMessage::Stop => "admin:stop",
            WsClientMessage::Reset => "admin:reset",
            WsClientMessage::Ping { .. } => "ping",
        }
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsServerMessage {
    /// Full session snapshot, sent on connect and after every mutation.
    #[serde(rename = "state:update")]
    StateUpdate(StateSnapshot),
    /// Reply to `admin:authenticate`, sent to the requesting connection only.
    #[serde(rename = "admin:authenticate:reply")]
    AuthenticateReply { ok: bool },
    /// A request from this connection was rejected.
    #[serde(rename = "error")]
    Error { code: String, message: String },
    /// Keepalive response.
    #[serde(rename = "pong")]
    Pong { timestamp: u64 },
}
