//! Operational routes: liveness, readiness against the database, build version.

use crate::sql::Statement;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

/// The process is up; says nothing about the database.
async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// One `SELECT 1` round trip through the shared connection.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let round_trip = state.executor.fetch_all(&Statement::raw("SELECT 1")).await;
    let (code, status, database) = match round_trip {
        Ok(_) => (StatusCode::OK, "ok", "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
        }
    };
    (code, Json(json!({ "status": status, "database": database })))
}

async fn build_info() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health, GET /ready, GET /version.
pub fn status_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(liveness))
        .route("/ready", get(readiness))
        .route("/version", get(build_info))
        .with_state(state)
}
