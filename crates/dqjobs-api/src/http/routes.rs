//! HTTP route definitions.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::ApiState;

/// Build the service router.
pub fn create_router(state: Arc<ApiState>) -> Router {
    let api_routes = Router::new()
        .route("/jobs", get(handlers::list_jobs))
        .route("/jobs/instances", get(handlers::list_instances))
        .route(
            "/job",
            post(handlers::create_job).delete(handlers::delete_job_by_name),
        )
        .route("/job/health", get(handlers::job_health))
        .route("/job/{id}", delete(handlers::delete_job_by_id))
        .route("/measure", post(handlers::create_measure))
        .route("/measures", get(handlers::list_measures))
        .route("/measure/{id}", delete(handlers::delete_measure));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::liveness))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
