//! API service routes
//!
//! Resources live under `/api/v1`; `/health` sits at the root so probes do
//! not depend on the API version.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod auth;
mod catalog;
mod comments;
mod reviews;
mod titles;
mod users;


/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(catalog::router())
        .merge(titles::router())
        .merge(reviews::router())
        .merge(comments::router());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    let (status, label) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(json!({
            "status": label,
            "service": "api-service",
            "database": database
        })),
    )
}
