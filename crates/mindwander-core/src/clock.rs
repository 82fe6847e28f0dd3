//! Session clock with elapsed-time accounting across start/stop cycles.

use std::time::Duration;
use tokio::time::Instant;

/// Running/stopped clock.
///
/// Elapsed time is never stored; it is derived from the time accrued over
/// completed cycles plus the live delta of the current cycle. All operations
/// take the current instant so callers decide what "now" is.
#[derive(Debug, Clone, Default)]
pub struct SessionClock {
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Start the clock. Returns false if it was already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(now);
        true
    }

    /// Stop the clock, folding the current cycle into the accumulated time.
    /// Returns false if it was already stopped.
    pub fn stop(&mut self, now: Instant) -> bool {
        match self.started_at.take() {
            Some(started_at) => {
                self.accumulated += now.saturating_duration_since(started_at);
                true
            }
            None => false,
        }
    }

    /// Total running time as of `now`.
    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started_at) => self.accumulated + now.saturating_duration_since(started_at),
            None => self.accumulated,
        }
    }

    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        u64::try_from(self.elapsed(now).as_millis()).unwrap_or(u64::MAX)
    }

    /// Stop without accruing and zero the accumulated time.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_new_clock_is_stopped_and_zero() {
        let clock = SessionClock::new();
        let now = Instant::now();
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed_ms(now), 0);
    }

    #[test]
    fn test_elapsed_accumulates_across_cycles() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new();

        assert!(clock.start(t0));
        assert!(clock.stop(t0 + ms(1500)));
        // Stopped time is not counted.
        assert!(clock.start(t0 + ms(4000)));
        assert_eq!(clock.elapsed_ms(t0 + ms(4250)), 1750);
        assert!(clock.stop(t0 + ms(4500)));

        assert_eq!(clock.elapsed_ms(t0 + ms(10_000)), 2000);
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new();

        assert!(!clock.stop(t0));
        assert!(clock.start(t0));
        // A second start must not move the start instant.
        assert!(!clock.start(t0 + ms(500)));
        assert_eq!(clock.elapsed_ms(t0 + ms(1000)), 1000);
        assert!(clock.stop(t0 + ms(1000)));
        assert!(!clock.stop(t0 + ms(3000)));
        assert_eq!(clock.elapsed_ms(t0 + ms(3000)), 1000);
    }

    #[test]
    fn test_elapsed_is_a_pure_read() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new();
        clock.start(t0);
        let _ = clock.elapsed(t0 + ms(700));
        assert!(clock.is_running());
        assert_eq!(clock.elapsed_ms(t0 + ms(300)), 300);
    }

    #[test]
    fn test_reset_from_running() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new();
        clock.start(t0);
        clock.reset();
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed_ms(t0 + ms(5000)), 0);
    }

    proptest! {
        /// Elapsed never decreases and equals the summed running durations.
        #[test]
        fn prop_elapsed_monotonic_and_exact(ops in proptest::collection::vec((any::<bool>(), 0u64..5_000), 0..64)) {
            let t0 = Instant::now();
            let mut clock = SessionClock::new();
            let mut now = t0;
            let mut expected = Duration::ZERO;
            let mut last = Duration::ZERO;

            for (start, gap) in ops {
                let advance = ms(gap);
                if clock.is_running() {
                    expected += advance;
                }
                now += advance;

                if start {
                    clock.start(now);
                } else {
                    clock.stop(now);
                }

                let elapsed = clock.elapsed(now);
                prop_assert!(elapsed >= last);
                prop_assert_eq!(elapsed, expected);
                last = elapsed;
            }
        }
    }
}
