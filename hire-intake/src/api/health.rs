//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    /// Whether a store round trip succeeded
    pub database: bool,
    pub notification_channels: usize,
}

/// GET /health
///
/// Always 200; `database` reports store reachability without retrying.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "hire-intake".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        notification_channels: state.hub.channel_count(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
