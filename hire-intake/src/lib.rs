//! hire-intake library - job-application ingestion service
//!
//! Resolves applicant identity, guards against duplicate submissions,
//! persists applications with a validated status lifecycle and fans out
//! live notifications to recruiter and applicant dashboards.

use axum::Router;
use hire_common::NotificationHub;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod pipeline;

pub use error::{IntakeError, IntakeResult};
use pipeline::{IngestionOrchestrator, RetryPolicy};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Process-wide notification channel registry
    pub hub: NotificationHub,
    pub orchestrator: IngestionOrchestrator,
}

impl AppState {
    pub fn new(db: SqlitePool, hub: NotificationHub, retry: RetryPolicy) -> Self {
        let orchestrator = IngestionOrchestrator::new(db.clone(), hub.clone(), retry);
        Self {
            db,
            hub,
            orchestrator,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, put};

    let applications = Router::new()
        .route(
            "/api/jobs/:job_id/applications",
            get(api::list_job_applications).post(api::submit_application),
        )
        .route(
            "/api/recruiters/:recruiter_id/applications",
            get(api::list_recruiter_applications),
        )
        .route(
            "/api/applications/:id",
            get(api::get_application).delete(api::withdraw_application),
        )
        .route("/api/applications/:id/status", put(api::update_application_status))
        .route("/api/events/:channel", get(api::subscribe));

    Router::new()
        .merge(applications)
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
