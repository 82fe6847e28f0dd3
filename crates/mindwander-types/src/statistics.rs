//! Statistics endpoint payloads.

use serde::{Deserialize, Serialize};

/// Aggregate rate statistics for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    /// Increments per participant per minute.
    pub per_minute_rate: f64,
    /// Connected participants.
    pub user_count: u64,
    /// Population standard deviation of the per-participant rates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_minute_std: Option<f64>,
}

/// Returned when statistics cannot be computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsError {
    pub error: String,
}
