//! The single session: counter, clock and participant count.

use mindwander_types::StateSnapshot;
use tokio::time::Instant;

use crate::SessionClock;

/// Process-wide session state.
///
/// Mutations report whether they changed anything so the owner can decide
/// what to broadcast; none of them can fail.
#[derive(Debug, Default)]
pub struct SessionState {
    count: u64,
    clock: SessionClock,
    participant_count: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn participant_count(&self) -> u64 {
        self.participant_count
    }

    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        self.clock.elapsed_ms(now)
    }

    /// Count one event. Ignored unless the clock is running.
    pub fn increment(&mut self) -> bool {
        if !self.clock.is_running() {
            return false;
        }
        self.count += 1;
        true
    }

    pub fn start(&mut self, now: Instant) -> bool {
        self.clock.start(now)
    }

    pub fn stop(&mut self, now: Instant) -> bool {
        self.clock.stop(now)
    }

    /// Zero the counter and the clock. Connected participants are kept.
    pub fn reset(&mut self) {
        self.count = 0;
        self.clock.reset();
    }

    pub fn add_participant(&mut self) {
        self.participant_count += 1;
    }

    pub fn remove_participant(&mut self) {
        self.participant_count = self.participant_count.saturating_sub(1);
    }

    pub fn snapshot(&self, now: Instant) -> StateSnapshot {
        StateSnapshot {
            count: self.count,
            running: self.clock.is_running(),
            elapsed: self.clock.elapsed_ms(now),
            participant_count: self.participant_count,
        }
    }
}
