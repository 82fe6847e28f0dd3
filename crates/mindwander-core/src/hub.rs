//! Session task owning all mutable state.
//!
//! Every connection talks to the session through a [`SessionHandle`]. Requests
//! are queued on one channel and applied one at a time by a single task, so a
//! mutation and its broadcast always complete before the next request is seen.

use mindwander_types::{ConnectionRole, StateSnapshot, StatisticsResponse};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    compute_statistics, ConnectionId, ConnectionRegistry, MindwanderError, ParticipantChange,
    Result, SessionState,
};

/// Queue depth for pending session requests.
const COMMAND_CAPACITY: usize = 256;

/// Configuration for the session task.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Shared admin secret, compared by exact match.
    pub admin_secret: String,
    /// How long a connection may stay unclassified before it counts as a participant.
    pub classification_grace: Duration,
    /// Buffered snapshots per subscriber before slow clients start lagging.
    pub broadcast_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            admin_secret: "1234".to_string(),
            classification_grace: Duration::from_millis(5000),
            broadcast_capacity: 64,
        }
    }
}

/// Admin-only lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOp {
    Start,
    Stop,
    Reset,
}

impl std::fmt::Display for AdminOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AdminOp::Start => "admin:start",
            AdminOp::Stop => "admin:stop",
            AdminOp::Reset => "admin:reset",
        };
        f.write_str(name)
    }
}

/// A freshly registered connection.
#[derive(Debug)]
pub struct Connected {
    pub id: ConnectionId,
    /// State at registration, to be sent to this connection before any update.
    pub snapshot: StateSnapshot,
    /// Every snapshot broadcast after registration.
    pub updates: broadcast::Receiver<StateSnapshot>,
}

enum Command {
    Connect {
        reply: oneshot::Sender<Connected>,
    },
    Disconnect {
        id: ConnectionId,
        reply: oneshot::Sender<()>,
    },
    Increment {
        id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    Authenticate {
        id: ConnectionId,
        secret: String,
        reply: oneshot::Sender<bool>,
    },
    Admin {
        id: ConnectionId,
        op: AdminOp,
        reply: oneshot::Sender<Result<StateSnapshot>>,
    },
    DeadlineExpired {
        id: ConnectionId,
    },
    Role {
        id: ConnectionId,
        reply: oneshot::Sender<Option<ConnectionRole>>,
    },
    Snapshot {
        reply: oneshot::Sender<StateSnapshot>,
    },
    Statistics {
        reply: oneshot::Sender<StatisticsResponse>,
    },
}

/// Cloneable handle to the session task.
///
/// The task stops once every handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Spawn the session task on the current runtime.
    pub fn spawn(config: SessionConfig) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let hub = SessionHub::new(config, tx.downgrade());
        tokio::spawn(hub.run(rx));
        Self { tx }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| MindwanderError::SessionUnavailable)?;
        rx.await.map_err(|_| MindwanderError::SessionUnavailable)
    }

    /// Register a new connection and start its classification timer.
    pub async fn connect(&self) -> Result<Connected> {
        self.request(|reply| Command::Connect { reply }).await
    }

    pub async fn disconnect(&self, id: ConnectionId) -> Result<()> {
        self.request(|reply| Command::Disconnect { id, reply }).await
    }

    /// Returns false if the session is stopped and the increment was ignored.
    pub async fn increment(&self, id: ConnectionId) -> Result<bool> {
        self.request(|reply| Command::Increment { id, reply }).await
    }

    /// Check `secret` against the admin secret and classify the connection.
    pub async fn authenticate(&self, id: ConnectionId, secret: impl Into<String>) -> Result<bool> {
        let secret = secret.into();
        self.request(|reply| Command::Authenticate { id, secret, reply })
            .await
    }

    pub async fn admin(&self, id: ConnectionId, op: AdminOp) -> Result<StateSnapshot> {
        self.request(|reply| Command::Admin { id, op, reply }).await?
    }

    pub async fn start(&self, id: ConnectionId) -> Result<StateSnapshot> {
        self.admin(id, AdminOp::Start).await
    }

    pub async fn stop(&self, id: ConnectionId) -> Result<StateSnapshot> {
        self.admin(id, AdminOp::Stop).await
    }

    pub async fn reset(&self, id: ConnectionId) -> Result<StateSnapshot> {
        self.admin(id, AdminOp::Reset).await
    }

    pub async fn role(&self, id: ConnectionId) -> Result<Option<ConnectionRole>> {
        self.request(|reply| Command::Role { id, reply }).await
    }

    pub async fn snapshot(&self) -> Result<StateSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn statistics(&self) -> Result<StatisticsResponse> {
        self.request(|reply| Command::Statistics { reply }).await
    }
}

struct SessionHub {
    config: SessionConfig,
    state: SessionState,
    registry: ConnectionRegistry,
    updates: broadcast::Sender<StateSnapshot>,
    /// Used by classification timers to post back into the queue without
    /// keeping the task alive.
    commands: mpsc::WeakSender<Command>,
}

impl SessionHub {
    fn new(config: SessionConfig, commands: mpsc::WeakSender<Command>) -> Self {
        let (updates, _) = broadcast::channel(config.broadcast_capacity.max(1));
        Self {
            config,
            state: SessionState::new(),
            registry: ConnectionRegistry::new(),
            updates,
            commands,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        info!(target: "mindwander::session", "Session task started");
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        info!(target: "mindwander::session", "Session task stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Connect { reply } => {
                let connected = self.connect();
                if let Err(connected) = reply.send(connected) {
                    // Caller went away before registration completed.
                    self.disconnect(connected.id);
                }
            }
            Command::Disconnect { id, reply } => {
                self.disconnect(id);
                let _ = reply.send(());
            }
            Command::Increment { id, reply } => {
                let _ = reply.send(self.increment(id));
            }
            Command::Authenticate { id, secret, reply } => {
                let _ = reply.send(self.authenticate(id, &secret));
            }
            Command::Admin { id, op, reply } => {
                let _ = reply.send(self.admin(id, op));
            }
            Command::DeadlineExpired { id } => {
                let change = self.registry.expire_deadline(id);
                if change == ParticipantChange::Joined {
                    info!(target: "mindwander::registry", "Connection {} classified as participant after grace period", id);
                }
                self.apply(change);
            }
            Command::Role { id, reply } => {
                let _ = reply.send(self.registry.role(id));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Statistics { reply } => {
                let snapshot = self.snapshot();
                let increments = self.registry.participant_increments();
                let _ = reply.send(compute_statistics(&snapshot, &increments));
            }
        }
    }

    fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot(Instant::now())
    }

    fn broadcast(&self) {
        let snapshot = self.snapshot();
        debug!(
            target: "mindwander::session",
            "Broadcasting state: count={} running={} elapsed={}ms users={}",
            snapshot.count, snapshot.running, snapshot.elapsed, snapshot.participant_count
        );
        // No receivers just means nobody is connected.
        let _ = self.updates.send(snapshot);
    }

    /// Apply a participant change to the session, broadcasting if it changed.
    fn apply(&mut self, change: ParticipantChange) {
        match change {
            ParticipantChange::Unchanged => return,
            ParticipantChange::Joined => self.state.add_participant(),
            ParticipantChange::Left => self.state.remove_participant(),
        }
        debug_assert_eq!(self.state.participant_count(), self.registry.participant_count());
        self.broadcast();
    }

    fn connect(&mut self) -> Connected {
        let id = ConnectionId::new();
        let deadline = self.schedule_deadline(id);
        self.registry.register(id, Some(deadline));
        info!(
            target: "mindwander::registry",
            "Connection {} registered ({} live)",
            id,
            self.registry.len()
        );
        Connected {
            id,
            snapshot: self.snapshot(),
            updates: self.updates.subscribe(),
        }
    }

    fn schedule_deadline(&self, id: ConnectionId) -> AbortHandle {
        let commands = self.commands.clone();
        let grace = self.config.classification_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(Command::DeadlineExpired { id }).await;
            }
        })
        .abort_handle()
    }

    fn disconnect(&mut self, id: ConnectionId) {
        let role = self.registry.role(id);
        let change = self.registry.remove(id);
        if let Some(role) = role {
            info!(
                target: "mindwander::registry",
                "Connection {} ({}) disconnected ({} live)",
                id,
                role,
                self.registry.len()
            );
        }
        self.apply(change);
    }

    fn increment(&mut self, id: ConnectionId) -> bool {
        if !self.state.increment() {
            debug!(target: "mindwander::session", "Ignoring increment from {} while stopped", id);
            return false;
        }
        self.registry.record_increment(id);
        self.broadcast();
        true
    }

    fn authenticate(&mut self, id: ConnectionId, secret: &str) -> bool {
        let success = secret == self.config.admin_secret;
        if success {
            info!(target: "mindwander::registry", "Connection {} authenticated as admin", id);
        } else {
            info!(target: "mindwander::registry", "Connection {} failed admin authentication", id);
        }
        let change = self.registry.apply_authentication(id, success);
        self.apply(change);
        success
    }

    fn admin(&mut self, id: ConnectionId, op: AdminOp) -> Result<StateSnapshot> {
        if !self.registry.is_admin(id) {
            warn!(target: "mindwander::session", "Rejected {} from non-admin connection {}", op, id);
            return Err(MindwanderError::NotAdmin {
                connection: id,
                operation: op,
            });
        }

        let now = Instant::now();
        match op {
            AdminOp::Start => {
                if self.state.start(now) {
                    info!(target: "mindwander::session", "Session started");
                }
            }
            AdminOp::Stop => {
                if self.state.stop(now) {
                    info!(target: "mindwander::session", "Session stopped at {}ms", self.state.elapsed_ms(now));
                }
            }
            AdminOp::Reset => {
                self.state.reset();
                self.registry.reset_increments();
                info!(target: "mindwander::session", "Session reset");
            }
        }
        // Re-broadcast even when the operation was a no-op.
        self.broadcast();
        Ok(self.snapshot())
    }
}
