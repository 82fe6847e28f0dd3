//! Statistics routes.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use mindwander_types::{StatisticsError, StatisticsResponse};
use std::sync::Arc;

pub async fn get(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatisticsResponse>, (StatusCode, Json<StatisticsError>)> {
    state.session.statistics().await.map(Json).map_err(|e| {
        tracing::warn!(target: "mindwander::api", "Statistics unavailable: {}", e);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(StatisticsError {
                error: e.to_string(),
            }),
        )
    })
}
