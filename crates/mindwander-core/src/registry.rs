//! Connection registry and admin/participant classification.

use mindwander_types::ConnectionRole;
use std::collections::HashMap;
use tokio::task::AbortHandle;
use tracing::debug;
use uuid::Uuid;

/// Opaque identifier of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Effect of a registry operation on the participant count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantChange {
    Unchanged,
    Joined,
    Left,
}

#[derive(Debug)]
struct Connection {
    role: ConnectionRole,
    /// Pending classification timer, if any.
    deadline: Option<AbortHandle>,
    /// Increments accepted from this connection since the last reset.
    increments: u64,
}

impl Connection {
    fn cancel_deadline(&mut self) {
        if let Some(handle) = self.deadline.take() {
            handle.abort();
        }
    }
}

/// Tracks every live connection and its role.
///
/// The registry only classifies; the caller applies the returned
/// [`ParticipantChange`] to the session and broadcasts.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn role(&self, id: ConnectionId) -> Option<ConnectionRole> {
        self.connections.get(&id).map(|c| c.role)
    }

    pub fn is_admin(&self, id: ConnectionId) -> bool {
        self.role(id) == Some(ConnectionRole::Admin)
    }

    /// Register a new unclassified connection with its classification timer.
    pub fn register(&mut self, id: ConnectionId, deadline: Option<AbortHandle>) {
        let previous = self.connections.insert(
            id,
            Connection {
                role: ConnectionRole::Unclassified,
                deadline,
                increments: 0,
            },
        );
        if let Some(mut previous) = previous {
            previous.cancel_deadline();
        }
    }

    /// The grace period ran out. Promotes the connection to participant if
    /// nothing classified it first.
    pub fn expire_deadline(&mut self, id: ConnectionId) -> ParticipantChange {
        let Some(conn) = self.connections.get_mut(&id) else {
            debug!(target: "mindwander::registry", "Deadline fired for departed connection {}", id);
            return ParticipantChange::Unchanged;
        };
        conn.deadline = None;
        if conn.role != ConnectionRole::Unclassified {
            return ParticipantChange::Unchanged;
        }
        conn.role = ConnectionRole::Participant;
        ParticipantChange::Joined
    }

    /// Apply the outcome of an authentication attempt.
    ///
    /// Success makes the connection admin; a participant that authenticates
    /// withdraws its participant contribution. Failure classifies an
    /// unclassified connection as participant and leaves any other role alone.
    pub fn apply_authentication(&mut self, id: ConnectionId, success: bool) -> ParticipantChange {
        let Some(conn) = self.connections.get_mut(&id) else {
            return ParticipantChange::Unchanged;
        };
        conn.cancel_deadline();

        match (conn.role, success) {
            (ConnectionRole::Unclassified, true) => {
                conn.role = ConnectionRole::Admin;
                ParticipantChange::Unchanged
            }
            (ConnectionRole::Unclassified, false) => {
                conn.role = ConnectionRole::Participant;
                ParticipantChange::Joined
            }
            (ConnectionRole::Participant, true) => {
                conn.role = ConnectionRole::Admin;
                ParticipantChange::Left
            }
            (ConnectionRole::Participant, false) | (ConnectionRole::Admin, _) => {
                ParticipantChange::Unchanged
            }
        }
    }

    /// Remove a connection, cancelling its timer.
    pub fn remove(&mut self, id: ConnectionId) -> ParticipantChange {
        let Some(mut conn) = self.connections.remove(&id) else {
            return ParticipantChange::Unchanged;
        };
        conn.cancel_deadline();
        if conn.role == ConnectionRole::Participant {
            ParticipantChange::Left
        } else {
            ParticipantChange::Unchanged
        }
    }

    pub fn record_increment(&mut self, id: ConnectionId) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.increments += 1;
        }
    }

    pub fn reset_increments(&mut self) {
        for conn in self.connections.values_mut() {
            conn.increments = 0;
        }
    }

    /// Per-connection increment counts of connected participants.
    pub fn participant_increments(&self) -> Vec<u64> {
        self.connections
            .values()
            .filter(|c| c.role == ConnectionRole::Participant)
            .map(|c| c.increments)
            .collect()
    }

    pub fn participant_count(&self) -> u64 {
        self.connections
            .values()
            .filter(|c| c.role == ConnectionRole::Participant)
            .count() as u64
    }
}
