//! Shared application state.

use crate::config::Config;
use mindwander_core::SessionHandle;

/// Shared application state.
pub struct AppState {
    pub session: SessionHandle,
    pub config: Config,
}

impl AppState {
    /// Spawn the session task. Must be called inside a Tokio runtime.
    pub fn new(config: Config) -> Self {
        let session = SessionHandle::spawn(config.session_config());
        Self { session, config }
    }
}
