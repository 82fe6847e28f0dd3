//! HTTP route handlers.

pub mod statistics;
pub mod ws;

use crate::state::AppState;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/statistics", get(statistics::get))
        .route("/health", get(health));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws::upgrade))
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
