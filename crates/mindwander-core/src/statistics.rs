//! Per-minute rate statistics for the admin dashboard.

use mindwander_types::{StateSnapshot, StatisticsResponse};

const MS_PER_MINUTE: f64 = 60_000.0;

/// Increments per participant per minute. Zero when there are no
/// participants or no elapsed time.
pub fn per_minute_rate(count: u64, participants: u64, elapsed_ms: u64) -> f64 {
    if participants == 0 || elapsed_ms == 0 {
        return 0.0;
    }
    let minutes = elapsed_ms as f64 / MS_PER_MINUTE;
    (count as f64 / participants as f64) / minutes
}

/// Population standard deviation of each participant's own per-minute rate.
pub fn per_minute_std(increments: &[u64], elapsed_ms: u64) -> Option<f64> {
    if increments.is_empty() || elapsed_ms == 0 {
        return None;
    }
    let minutes = elapsed_ms as f64 / MS_PER_MINUTE;
    let rates: Vec<f64> = increments.iter().map(|&n| n as f64 / minutes).collect();
    let n = rates.len() as f64;
    let mean = rates.iter().sum::<f64>() / n;
    let variance = rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}

pub fn compute_statistics(snapshot: &StateSnapshot, increments: &[u64]) -> StatisticsResponse {
    StatisticsResponse {
        per_minute_rate: per_minute_rate(
            snapshot.count,
            snapshot.participant_count,
            snapshot.elapsed,
        ),
        user_count: snapshot.participant_count,
        per_minute_std: per_minute_std(increments, snapshot.elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_for_two_participants_over_two_minutes() {
        assert_eq!(per_minute_rate(3, 2, 120_000), 0.75);
    }

    #[test]
    fn test_rate_guards_division_by_zero() {
        assert_eq!(per_minute_rate(10, 0, 120_000), 0.0);
        assert_eq!(per_minute_rate(10, 3, 0), 0.0);
    }

    #[test]
    fn test_std_of_uniform_rates_is_zero() {
        assert_eq!(per_minute_std(&[2, 2, 2], 60_000), Some(0.0));
    }

    #[test]
    fn test_std_of_spread_rates() {
        // Rates over one minute are 1 and 3: mean 2, deviation 1.
        let std = per_minute_std(&[1, 3], 60_000).unwrap();
        assert!((std - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_absent_without_participants_or_time() {
        assert_eq!(per_minute_std(&[], 60_000), None);
        assert_eq!(per_minute_std(&[1, 2], 0), None);
    }

    #[test]
    fn test_compute_statistics() {
        let snapshot = StateSnapshot {
            count: 3,
            running: true,
            elapsed: 120_000,
            participant_count: 2,
        };
        let stats = compute_statistics(&snapshot, &[1, 2]);
        assert_eq!(stats.per_minute_rate, 0.75);
        assert_eq!(stats.user_count, 2);
        assert!(stats.per_minute_std.is_some());
    }
}
