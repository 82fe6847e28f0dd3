//! Error types for Mindwander.

use thiserror::Error;

use crate::{AdminOp, ConnectionId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MindwanderError {
    #[error("Connection {connection} is not authenticated as admin (attempted {operation})")]
    NotAdmin {
        connection: ConnectionId,
        operation: AdminOp,
    },

    #[error("Session state unavailable")]
    SessionUnavailable,
}

impl MindwanderError {
    /// Short machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            MindwanderError::NotAdmin { .. } => "not_admin",
            MindwanderError::SessionUnavailable => "session_unavailable",
        }
    }
}
