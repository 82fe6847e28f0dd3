//! Core session state and connection classification for Mindwander.

mod clock;
mod error;
mod hub;
mod registry;
mod session;
mod statistics;

pub use clock::SessionClock;
pub use error::MindwanderError;
pub use hub::{AdminOp, Connected, SessionConfig, SessionHandle};
pub use registry::{ConnectionId, ConnectionRegistry, ParticipantChange};
pub use session::SessionState;
pub use statistics::{per_minute_rate, per_minute_std, compute_statistics};

/// Result type for Mindwander operations.
pub type Result<T> = std::result::Result<T, MindwanderError>;
