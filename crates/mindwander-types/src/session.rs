//! Session state as seen by clients.

use serde::{Deserialize, Serialize};

/// Complete broadcastable view of the session at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Accepted increments since the last reset.
    pub count: u64,
    /// Whether the session clock is running.
    pub running: bool,
    /// Elapsed running time in milliseconds.
    pub elapsed: u64,
    /// Connections classified as participants.
    #[serde(rename = "userCount")]
    pub participant_count: u64,
}

/// Role of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionRole {
    /// Connected but not yet classified.
    Unclassified,
    /// Authenticated with the admin secret.
    Admin,
    /// Counted towards the per-minute rate denominator.
    Participant,
}

impl ConnectionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionRole::Unclassified => "unclassified",
            ConnectionRole::Admin => "admin",
            ConnectionRole::Participant => "participant",
        }
    }
}

impl std::fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_uses_user_count_on_the_wire() {
        let snapshot = StateSnapshot {
            count: 3,
            running: false,
            elapsed: 2000,
            participant_count: 1,
        };
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"count": 3, "running": false, "elapsed": 2000, "userCount": 1})
        );
    }

    #[test]
    fn test_role_display() {
        assert_eq!(ConnectionRole::Participant.to_string(), "participant");
        assert_eq!(ConnectionRole::Admin.as_str(), "admin");
    }
}
